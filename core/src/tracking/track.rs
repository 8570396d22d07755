use crate::math::{AngleHelper, StatsHelper};
use crate::protocol::{ImageTarget, RadarMode, RadarTarget};
use serde::Serialize;

/// Distance at which the proximity term of the threat score reaches zero.
pub const THREAT_RANGE_M: f64 = 50_000.0;
pub const THREAT_SPEED_M_S: f64 = 400.0;
pub const MAX_THREAT_SCORE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Image,
    Radar,
    Fused,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: u8,
    pub distance_m: f64,
    pub azimuth_deg: f64,
    pub speed_m_s: f64,
    pub last_update: f64,
    pub source: TrackSource,
    pub rcs_db: Option<f64>,
    pub threat_score: f64,
}

impl Track {
    pub fn from_image(
        id: u8,
        image: &ImageTarget,
        source: TrackSource,
        rcs_db: Option<f64>,
        now: f64,
    ) -> Self {
        Self {
            id,
            distance_m: image.distance_m,
            azimuth_deg: AngleHelper::wrap_degrees(image.azimuth_deg),
            speed_m_s: image.speed_m_s,
            last_update: now,
            source,
            rcs_db,
            threat_score: 0.0,
        }
    }

    pub fn from_radar(radar: &RadarTarget, now: f64) -> Self {
        Self {
            id: radar.id,
            distance_m: radar.distance_m,
            azimuth_deg: AngleHelper::wrap_degrees(radar.azimuth_deg),
            speed_m_s: radar.velocity_m_s,
            last_update: now,
            source: TrackSource::Radar,
            rcs_db: Some(radar.rcs_db),
            threat_score: 0.0,
        }
    }

    /// Pulls the smoothed state toward a sample; `alpha` weights the sample.
    pub fn blend(
        &mut self,
        distance_m: f64,
        azimuth_deg: f64,
        speed_m_s: f64,
        alpha: f64,
        source: TrackSource,
        now: f64,
    ) {
        self.distance_m = StatsHelper::smooth(self.distance_m, distance_m, alpha);
        self.azimuth_deg = AngleHelper::blend(self.azimuth_deg, azimuth_deg, alpha);
        self.speed_m_s = StatsHelper::smooth(self.speed_m_s, speed_m_s, alpha);
        self.source = source;
        self.last_update = now;
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_update
    }

    /// Proximity, speed and RCS heuristic scaled by the radar mode.
    pub fn compute_threat(&self, mode: RadarMode) -> f64 {
        let proximity = (1.0 - self.distance_m / THREAT_RANGE_M).max(0.0);
        let speed = (self.speed_m_s.abs() / THREAT_SPEED_M_S).min(1.0);
        let rcs = self.rcs_db.map(|rcs| (rcs + 20.0) / 40.0).unwrap_or(0.5);
        let score = (0.6 * proximity + 0.3 * speed + 0.1 * rcs) * mode.threat_factor();
        score.clamp(0.0, MAX_THREAT_SCORE)
    }
}
