//! Persistent roster for the linear and circular motion regimes.

use crate::generator::random::{draw_emission, draw_speed, draw_target_type, mode_rcs_bias};
use crate::generator::{GeneratorConfig, MotionMode};
use crate::math::AngleHelper;
use crate::protocol::{ImageTarget, RadarMode, RadarTarget, TargetType, PREDICTION_HORIZON_S};
use rand::Rng;
use serde::Serialize;

pub const ROSTER_BASE_ID: u8 = 101;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionTarget {
    pub id: u8,
    pub distance_m: f64,
    pub azimuth_deg: f64,
    pub radial_speed_m_s: f64,
    pub angular_speed_deg_s: f64,
    pub target_type: TargetType,
}

impl MotionTarget {
    /// Steps the target by `dt`, reflecting off the distance bounds and
    /// wrapping azimuth.
    pub fn advance(&mut self, dt: f64, min_distance: f64, max_distance: f64) {
        let mut distance = self.distance_m + self.radial_speed_m_s * dt;
        if distance < min_distance {
            distance = min_distance + (min_distance - distance);
            self.radial_speed_m_s = self.radial_speed_m_s.abs();
        } else if distance > max_distance {
            distance = max_distance - (distance - max_distance);
            self.radial_speed_m_s = -self.radial_speed_m_s.abs();
        }
        self.distance_m = distance.clamp(min_distance, max_distance);
        self.azimuth_deg = AngleHelper::wrap_degrees(self.azimuth_deg + self.angular_speed_deg_s * dt);
    }

    pub fn tangential_speed_m_s(&self) -> f64 {
        self.distance_m * self.angular_speed_deg_s.to_radians()
    }

    pub fn speed_m_s(&self) -> f64 {
        self.radial_speed_m_s.hypot(self.tangential_speed_m_s())
    }

    pub fn heading_deg(&self) -> f64 {
        let offset = self
            .tangential_speed_m_s()
            .atan2(self.radial_speed_m_s)
            .to_degrees();
        AngleHelper::wrap_degrees(self.azimuth_deg + offset)
    }

    /// Position `horizon` seconds ahead along the current motion.
    pub fn predicted(&self, horizon: f64) -> (f64, f64) {
        (
            (self.distance_m + self.radial_speed_m_s * horizon).max(0.0),
            AngleHelper::wrap_degrees(self.azimuth_deg + self.angular_speed_deg_s * horizon),
        )
    }

    pub fn to_image_target<R: Rng>(&self, rng: &mut R) -> ImageTarget {
        let (predicted_distance_m, predicted_azimuth_deg) = self.predicted(PREDICTION_HORIZON_S);
        ImageTarget {
            id: self.id,
            type_code: self.target_type.code(),
            distance_m: self.distance_m,
            azimuth_deg: self.azimuth_deg,
            frequency_hz: draw_emission(rng, self.target_type),
            predicted_distance_m,
            predicted_azimuth_deg,
            speed_m_s: self.speed_m_s(),
            heading_deg: self.heading_deg(),
        }
    }

    pub fn to_radar_target<R: Rng>(&self, rng: &mut R, mode: RadarMode) -> RadarTarget {
        let base_rcs = match self.target_type {
            TargetType::Missile => rng.gen_range(-20.0..-5.0),
            TargetType::Surface => rng.gen_range(5.0..20.0),
            TargetType::Air => rng.gen_range(-5.0..10.0),
            TargetType::Unknown => rng.gen_range(-20.0..20.0),
        };
        RadarTarget {
            id: self.id,
            distance_m: self.distance_m,
            azimuth_deg: self.azimuth_deg,
            rcs_db: base_rcs + mode_rcs_bias(rng, mode),
            velocity_m_s: self.radial_speed_m_s,
        }
    }
}

pub fn spawn_roster<R: Rng>(
    rng: &mut R,
    config: &GeneratorConfig,
    motion_mode: MotionMode,
) -> Vec<MotionTarget> {
    let (min_distance, max_distance) = config.distance_bounds();
    let size = config.roster_size.min(usize::from(u8::MAX - ROSTER_BASE_ID) + 1);
    (0..size)
        .map(|index| {
            let target_type = draw_target_type(rng, config);
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let (radial_speed_m_s, angular_speed_deg_s) = match motion_mode {
                MotionMode::Circular => (0.0, sign * rng.gen_range(2.0..8.0)),
                _ => (sign * draw_speed(rng, target_type), rng.gen_range(-0.5..0.5)),
            };
            MotionTarget {
                id: ROSTER_BASE_ID + index as u8,
                distance_m: rng.gen_range(min_distance..max_distance),
                azimuth_deg: rng.gen_range(0.0..360.0),
                radial_speed_m_s,
                angular_speed_deg_s,
                target_type,
            }
        })
        .collect()
}
