use crate::math::AngleHelper;
use crate::protocol::RadarMode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarStatus {
    pub power_on: bool,
    pub antenna_angle_deg: f64,
    pub scan_rate_deg_s: f64,
    pub frequency_hz: f64,
    pub prf_hz: f64,
    pub bandwidth_hz: f64,
}

impl RadarStatus {
    pub fn for_mode(mode: RadarMode) -> Self {
        let mut status = Self {
            power_on: true,
            antenna_angle_deg: 0.0,
            scan_rate_deg_s: 0.0,
            frequency_hz: 0.0,
            prf_hz: 1000.0,
            bandwidth_hz: 1.0e6,
        };
        status.apply_mode(mode);
        status
    }

    pub fn apply_mode(&mut self, mode: RadarMode) {
        let params = mode.params();
        self.scan_rate_deg_s = params.scan_rate_deg_s;
        self.frequency_hz = params.frequency_hz;
    }

    pub fn advance(&mut self, dt: f64) {
        if self.scan_rate_deg_s > 0.0 {
            self.antenna_angle_deg =
                AngleHelper::wrap_degrees(self.antenna_angle_deg + self.scan_rate_deg_s * dt);
        }
    }
}

impl Default for RadarStatus {
    fn default() -> Self {
        Self::for_mode(RadarMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antenna_sweeps_and_wraps() {
        let mut status = RadarStatus::for_mode(RadarMode::AirCombat);
        status.advance(1.0);
        assert_eq!(status.antenna_angle_deg, 180.0);
        status.advance(1.5);
        assert!((status.antenna_angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn frozen_modes_hold_antenna() {
        let mut status = RadarStatus::for_mode(RadarMode::FreezeFrame);
        status.advance(5.0);
        assert_eq!(status.antenna_angle_deg, 0.0);
        status.apply_mode(RadarMode::WeatherDetect);
        assert_eq!(status.frequency_hz, 5.6e9);
    }
}
