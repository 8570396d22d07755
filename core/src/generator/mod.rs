//! Synthetic image/radar detections and fire-control requests.
//!
//! Random mode redraws everything each tick. Linear and circular modes keep a
//! roster of [`MotionTarget`]s alive across ticks and project both detection
//! streams from it, so image and radar identifiers always agree.

pub mod motion;
pub mod random;
pub mod status;

pub use motion::MotionTarget;
pub use status::RadarStatus;

use crate::protocol::{
    FireControlRequest, Frame, ImageTarget, ParseModeError, RadarMode, RadarTarget,
};
use crate::telemetry::LogManager;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

pub const NOMINAL_TICK_S: f64 = 0.03;
/// Bounds applied to the wall-clock delta between motion updates.
pub const MIN_TICK_S: f64 = 0.01;
pub const MAX_TICK_S: f64 = 0.2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MotionMode {
    #[default]
    Random,
    Linear,
    Circular,
}

impl MotionMode {
    pub fn is_persistent(self) -> bool {
        !matches!(self, MotionMode::Random)
    }

    pub fn name(self) -> &'static str {
        match self {
            MotionMode::Random => "random",
            MotionMode::Linear => "linear",
            MotionMode::Circular => "circular",
        }
    }
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MotionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(MotionMode::Random),
            "linear" => Ok(MotionMode::Linear),
            "circular" => Ok(MotionMode::Circular),
            _ => Err(ParseModeError {
                kind: "motion mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub max_image_targets: usize,
    pub max_radar_targets: usize,
    pub max_requests: usize,
    pub roster_size: usize,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub air_probability: f64,
    pub surface_probability: f64,
    pub missile_probability: f64,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_image_targets: 8,
            max_radar_targets: 8,
            max_requests: 3,
            roster_size: 6,
            min_distance_m: 500.0,
            max_distance_m: 50_000.0,
            air_probability: 0.6,
            surface_probability: 0.3,
            missile_probability: 0.1,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Non-empty distance interval, whatever the configured values.
    pub fn distance_bounds(&self) -> (f64, f64) {
        let min = self.min_distance_m.max(0.0);
        let max = self.max_distance_m.max(min + 1.0);
        (min, max)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub image_targets: Vec<ImageTarget>,
    pub radar_targets: Vec<RadarTarget>,
    pub requests: Vec<FireControlRequest>,
}

impl TickOutput {
    pub fn to_frame(&self, stream_id: u8) -> Frame {
        Frame::new(
            stream_id,
            self.image_targets.clone(),
            self.radar_targets.clone(),
            self.requests.clone(),
        )
    }
}

pub struct TargetGenerator {
    config: GeneratorConfig,
    mode: RadarMode,
    motion_mode: MotionMode,
    rng: StdRng,
    roster: Vec<MotionTarget>,
    last_tick: Option<Instant>,
    status: RadarStatus,
    logger: LogManager,
}

impl TargetGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mode = RadarMode::default();
        Self {
            config,
            mode,
            motion_mode: MotionMode::default(),
            rng,
            roster: Vec::new(),
            last_tick: None,
            status: RadarStatus::for_mode(mode),
            logger: LogManager::new("generator"),
        }
    }

    pub fn mode(&self) -> RadarMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RadarMode) {
        self.mode = mode;
        self.status.apply_mode(mode);
        let params = mode.params();
        self.logger.record(&format!(
            "mode {} (scan {:.0} deg/s, carrier {:.2e} Hz)",
            mode, params.scan_rate_deg_s, params.frequency_hz
        ));
    }

    pub fn motion_mode(&self) -> MotionMode {
        self.motion_mode
    }

    /// Changing regime discards the roster; it is rebuilt on the next tick.
    pub fn set_motion_mode(&mut self, motion_mode: MotionMode) {
        if motion_mode == self.motion_mode {
            return;
        }
        self.motion_mode = motion_mode;
        self.roster.clear();
        self.last_tick = None;
        self.logger.record(&format!("motion mode {}", motion_mode));
    }

    pub fn status(&self) -> &RadarStatus {
        &self.status
    }

    pub fn roster(&self) -> &[MotionTarget] {
        &self.roster
    }

    pub fn generate_tick(&mut self) -> TickOutput {
        self.generate_tick_at(Instant::now())
    }

    pub fn generate_tick_at(&mut self, now: Instant) -> TickOutput {
        let dt = self.tick_delta(now);
        self.status.advance(dt.unwrap_or(NOMINAL_TICK_S));

        let output = if self.motion_mode.is_persistent() {
            self.motion_tick(dt)
        } else {
            TickOutput {
                image_targets: random::image_targets(&mut self.rng, &self.config),
                radar_targets: random::radar_targets(&mut self.rng, &self.config, self.mode),
                requests: random::requests(&mut self.rng, &self.config),
            }
        };

        self.logger.detail(&format!(
            "tick: {} image, {} radar, {} requests",
            output.image_targets.len(),
            output.radar_targets.len(),
            output.requests.len()
        ));
        output
    }

    fn tick_delta(&mut self, now: Instant) -> Option<f64> {
        let dt = self.last_tick.map(|previous| {
            now.saturating_duration_since(previous)
                .as_secs_f64()
                .clamp(MIN_TICK_S, MAX_TICK_S)
        });
        self.last_tick = Some(now);
        dt
    }

    fn motion_tick(&mut self, dt: Option<f64>) -> TickOutput {
        if self.roster.is_empty() {
            self.roster = motion::spawn_roster(&mut self.rng, &self.config, self.motion_mode);
            self.logger.record(&format!(
                "spawned {} {} targets",
                self.roster.len(),
                self.motion_mode
            ));
        } else if let Some(dt) = dt {
            let (min_distance, max_distance) = self.config.distance_bounds();
            for target in &mut self.roster {
                target.advance(dt, min_distance, max_distance);
            }
        }

        let rng = &mut self.rng;
        let image_targets = self
            .roster
            .iter()
            .map(|target| target.to_image_target(rng))
            .collect();
        let radar_targets = self
            .roster
            .iter()
            .map(|target| target.to_radar_target(rng, self.mode))
            .collect();

        let count = rng.gen_range(0..=self.config.max_requests);
        let requests = (0..count)
            .filter_map(|_| self.roster.choose(rng))
            .map(|target| FireControlRequest::from(target.id))
            .collect();

        TickOutput {
            image_targets,
            radar_targets,
            requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::AngleHelper;
    use std::time::Duration;

    fn seeded(motion_mode: MotionMode) -> TargetGenerator {
        let mut generator = TargetGenerator::new(GeneratorConfig {
            seed: Some(42),
            ..Default::default()
        });
        generator.set_motion_mode(motion_mode);
        generator
    }

    #[test]
    fn motion_streams_share_identifiers() {
        let mut generator = seeded(MotionMode::Linear);
        let output = generator.generate_tick();
        let image_ids: Vec<u8> = output.image_targets.iter().map(|t| t.id).collect();
        let radar_ids: Vec<u8> = output.radar_targets.iter().map(|t| t.id).collect();
        assert_eq!(image_ids.len(), 6);
        assert_eq!(image_ids, radar_ids);
        for request in &output.requests {
            assert!(image_ids.contains(&request.target_id));
        }
    }

    #[test]
    fn motion_advance_uses_clamped_delta() {
        let mut generator = seeded(MotionMode::Circular);
        let start = Instant::now();
        generator.generate_tick_at(start);
        let before = generator.roster().to_vec();

        // Five seconds of silence still only advances by the 0.2 s ceiling.
        generator.generate_tick_at(start + Duration::from_secs(5));
        for (old, new) in before.iter().zip(generator.roster()) {
            let expected = AngleHelper::wrap_degrees(
                old.azimuth_deg + old.angular_speed_deg_s * MAX_TICK_S,
            );
            assert!((new.azimuth_deg - expected).abs() < 1e-9);
            assert_eq!(new.distance_m, old.distance_m);
        }
    }

    #[test]
    fn roster_persists_until_motion_mode_changes() {
        let mut generator = seeded(MotionMode::Linear);
        let start = Instant::now();
        generator.generate_tick_at(start);
        let ids: Vec<u8> = generator.roster().iter().map(|t| t.id).collect();
        generator.generate_tick_at(start + Duration::from_millis(30));
        let again: Vec<u8> = generator.roster().iter().map(|t| t.id).collect();
        assert_eq!(ids, again);

        generator.set_motion_mode(MotionMode::Random);
        assert!(generator.roster().is_empty());
        let output = generator.generate_tick_at(start + Duration::from_millis(60));
        assert!(output.image_targets.len() <= 8);
        assert!(generator.roster().is_empty());
    }

    #[test]
    fn set_mode_updates_status_table() {
        let mut generator = seeded(MotionMode::Random);
        generator.set_mode(RadarMode::Beacon);
        assert_eq!(generator.mode(), RadarMode::Beacon);
        assert_eq!(generator.status().frequency_hz, 1.0e9);
        assert_eq!(generator.status().scan_rate_deg_s, 0.0);
    }

    #[test]
    fn motion_mode_parses_case_insensitively() {
        assert_eq!("Circular".parse::<MotionMode>().unwrap(), MotionMode::Circular);
        assert!("zigzag".parse::<MotionMode>().is_err());
    }

    #[test]
    fn tick_output_builds_encodable_frame() {
        let mut generator = seeded(MotionMode::Linear);
        let frame = generator.generate_tick().to_frame(4);
        assert_eq!(frame.stream_id, 4);
        assert_eq!(frame.image_targets.len(), 6);
        assert_eq!(frame.length, frame.length_field());
    }
}
