//! Types a driver needs to wire the core together.

pub use crate::generator::{GeneratorConfig, MotionMode, RadarStatus, TargetGenerator, TickOutput};
pub use crate::protocol::{
    FireControlRequest, Frame, FrameCodec, FrameError, ImageTarget, ParseModeError, RadarMode,
    RadarTarget, TargetType,
};
pub use crate::telemetry::{LinkMetrics, MetricsSnapshot};
pub use crate::tracking::{
    FireControlResponse, FireControlStatus, FusionTracker, SharedTracker, Track, TrackSource,
};
pub use crate::transport::{ReceiveCallback, Transport, TransportError};
