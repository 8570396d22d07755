use crate::workflow::config::Role;
use radarcore::generator::{MotionMode, RadarStatus};
use radarcore::protocol::RadarMode;
use radarcore::telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FireControlQuery {
    pub ids: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub role: Role,
    pub link_active: bool,
    pub peers: usize,
    pub mode: RadarMode,
    pub motion: MotionMode,
    pub ticks: u64,
    pub tracks: usize,
    pub radar: RadarStatus,
    pub metrics: MetricsSnapshot,
}
