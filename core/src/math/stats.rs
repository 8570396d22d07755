pub struct StatsHelper;

impl StatsHelper {
    pub fn smooth(current: f64, sample: f64, alpha: f64) -> f64 {
        alpha * sample + (1.0 - alpha) * current
    }

    pub fn normalized_difference(a: f64, b: f64) -> f64 {
        (a - b).abs() / ((a + b) / 2.0).max(1.0)
    }
}
