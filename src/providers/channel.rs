//! Channel-fed byte source

use tokio::sync::mpsc;

use crate::Result;
use crate::provider::{ByteSource, Chunk};

/// Sending half paired with a [`ChannelSource`]
pub type ChunkSender = mpsc::Sender<Chunk>;

/// Byte source fed through an mpsc channel.
///
/// Useful when the application already owns the serial port, or to drive the
/// pipeline from tests. The stream ends once every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<Chunk>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl ByteSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        Ok(self.rx.recv().await)
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}
