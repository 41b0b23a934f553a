//! Byte source trait

use chrono::{DateTime, Utc};

use crate::Result;

/// One read from the reader's serial stream, with no framing guarantees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    /// When the bytes arrived. Detections in this chunk are timed at this instant.
    pub received_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(data: Vec<u8>, received_at: DateTime<Utc>) -> Self {
        Self { data, received_at }
    }

    /// Chunk stamped with the current wall clock
    pub fn now(data: Vec<u8>) -> Self {
        Self::new(data, Utc::now())
    }

    /// Arrival time as Unix milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        u64::try_from(self.received_at.timestamp_millis()).unwrap_or(0)
    }
}

/// Source of raw reader bytes
///
/// Sources abstract over where the bytes come from (a device node, a pipe,
/// a recorded frame log) and deliver them strictly in arrival order.
///
/// `next_chunk` is raced against viewer commands, so implementations must be
/// cancel safe: dropping the future before it completes must not lose bytes.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Get the next chunk of bytes
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - Bytes available
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(e)` - Error occurred; the driver may call again after a backoff
    async fn next_chunk(&mut self) -> Result<Option<Chunk>>;

    /// Short human readable name for logs
    fn describe(&self) -> String;
}
