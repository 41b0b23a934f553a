//! Byte source implementations

pub mod channel;
pub mod reader;
pub mod replay;

pub use channel::{ChannelSource, ChunkSender};
pub use reader::ReaderSource;
pub use replay::CaptureReplaySource;
