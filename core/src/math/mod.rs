pub mod angles;
pub mod stats;

pub use angles::AngleHelper;
pub use stats::StatsHelper;
