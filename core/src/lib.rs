//! Core of the radar interface simulator.
//!
//! Simulator instances exchange binary radar frames over TCP. Each instance
//! synthesizes image and radar detections, fuses them into tracks and answers
//! fire-control requests against the track table.

pub mod generator;
pub mod math;
pub mod prelude;
pub mod protocol;
pub mod telemetry;
pub mod tracking;
pub mod transport;

pub use prelude::{Frame, FrameCodec, FusionTracker, TargetGenerator, Transport};
