//! Core types shared across the pipeline.
//!
//! - [`Frame`] is one complete reader frame as cut from the byte stream,
//!   classified by its header into a [`FrameKind`]
//! - [`RaceMode`] selects the ranking and finish rule
//!
//! ## Usage Example
//!
//! ```rust
//! use lapgate::types::{Frame, FrameKind, RaceMode};
//!
//! let frame = Frame::new(vec![0x01, 0x00, 0x7B, 0x01, 0xF4, 0x00, 0x19, 0x96]).unwrap();
//! assert_eq!(frame.kind(), FrameKind::Telemetry);
//! assert_eq!(frame.checksum(), 0x96);
//!
//! assert_eq!(RaceMode::try_from(3).unwrap(), RaceMode::FastestLap);
//! assert!(RaceMode::try_from(4).is_err());
//! ```

mod frame;
mod race_mode;

pub use frame::{
    CHECKPOINT_FRAME_LEN, CHECKPOINT_HEADER, Frame, FrameKind, TELEMETRY_FRAME_LEN,
    TELEMETRY_HEADER,
};
pub use race_mode::RaceMode;
