pub struct AngleHelper;

impl AngleHelper {
    pub fn wrap_degrees(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs.
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    pub fn circular_difference(a: f64, b: f64) -> f64 {
        let direct = (Self::wrap_degrees(a) - Self::wrap_degrees(b)).abs();
        direct.min(360.0 - direct)
    }

    /// Weighted unit-vector average; `alpha` is the weight of `sample`.
    /// Moves across the 0/360 seam in the short direction.
    pub fn blend(current: f64, sample: f64, alpha: f64) -> f64 {
        let (current_sin, current_cos) = current.to_radians().sin_cos();
        let (sample_sin, sample_cos) = sample.to_radians().sin_cos();
        let x = current_cos * (1.0 - alpha) + sample_cos * alpha;
        let y = current_sin * (1.0 - alpha) + sample_sin * alpha;
        Self::wrap_degrees(y.atan2(x).to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_handles_negative_and_large_angles() {
        assert_eq!(AngleHelper::wrap_degrees(-10.0), 350.0);
        assert_eq!(AngleHelper::wrap_degrees(725.0), 5.0);
        assert_eq!(AngleHelper::wrap_degrees(360.0), 0.0);
    }

    #[test]
    fn circular_difference_takes_short_way() {
        assert!((AngleHelper::circular_difference(359.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((AngleHelper::circular_difference(50.0, 50.2) - 0.2).abs() < 1e-9);
        assert_eq!(AngleHelper::circular_difference(0.0, 180.0), 180.0);
    }

    #[test]
    fn blend_crosses_zero_in_short_direction() {
        let blended = AngleHelper::blend(359.0, 1.0, 0.6);
        let distance_to_seam = AngleHelper::circular_difference(blended, 0.0);
        assert!(distance_to_seam < 1.0, "blended to {}", blended);
        assert!((blended - 0.2).abs() < 1e-3);
    }

    #[test]
    fn blend_with_full_weight_returns_sample() {
        assert!((AngleHelper::blend(10.0, 200.0, 1.0) - 200.0).abs() < 1e-9);
    }
}
