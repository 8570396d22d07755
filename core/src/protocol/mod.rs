//! Binary frame protocol shared by every simulator instance on the link.

pub mod codec;
pub mod frame;
pub mod mode;

pub use codec::{hexdump, FrameCodec, FrameError};
pub use frame::{
    FireControlRequest, Frame, ImageTarget, RadarTarget, TargetType, FRAME_HEADER,
    IMAGE_RECORD_LEN, PREDICTION_HORIZON_S, RADAR_RECORD_LEN,
};
pub use mode::{ModeParams, ParseModeError, RadarMode};
