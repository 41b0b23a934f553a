//! Replay provider for recorded frame logs

use std::collections::VecDeque;
use std::path::Path;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, trace};

use crate::frame_log::{CHUNK_PREFIX, parse_line};
use crate::provider::{ByteSource, Chunk};
use crate::{Result, TimingError};

/// Replays the `Received chunk` lines of a frame log.
///
/// Chunks keep their recorded arrival times, so a replayed race produces the
/// same lap times as the live one. Pacing between chunks follows the recorded
/// gaps divided by the playback speed; a speed of zero replays as fast as the
/// pipeline consumes.
pub struct CaptureReplaySource {
    name: String,
    chunks: VecDeque<Chunk>,
    total: usize,
    speed: f64,
    /// Arrival time of the previously delivered chunk
    last_delivered: Option<chrono::DateTime<chrono::Utc>>,
    /// Deadline for the chunk at the front; survives cancellation of `next_chunk`
    due: Option<Instant>,
}

impl CaptureReplaySource {
    /// Load a frame log from disk.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        let source = Self::from_log_str(path.display().to_string(), &text)?;

        info!("Opened frame log {}: {} chunks over {:?}", path.display(), source.total, source.duration());
        Ok(source)
    }

    /// Parse frame log text. Lines other than `Received chunk` are ignored.
    pub fn from_log_str(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let mut chunks = VecDeque::new();

        for (index, line) in text.lines().enumerate() {
            let Some((at, message)) = parse_line(line) else {
                trace!(line = index + 1, "skipping unparseable log line");
                continue;
            };
            let Some(hex_bytes) = message.strip_prefix(CHUNK_PREFIX) else {
                continue;
            };
            let data = hex::decode(hex_bytes.trim()).map_err(|e| {
                TimingError::parse_error(format!("{}:{}", name, index + 1), e.to_string())
            })?;
            chunks.push_back(Chunk::new(data, at));
        }

        let total = chunks.len();
        Ok(Self { name, chunks, total, speed: 1.0, last_delivered: None, due: None })
    }

    /// Set playback speed; zero disables pacing. Negative values are treated as zero.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        self.due = None;
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.set_speed(speed);
        self
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Chunks not yet delivered
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_chunks(&self) -> usize {
        self.total
    }

    /// Recorded time between the first and last remaining chunk
    pub fn duration(&self) -> Duration {
        match (self.chunks.front(), self.chunks.back()) {
            (Some(first), Some(last)) => {
                (last.received_at - first.received_at).to_std().unwrap_or_default()
            }
            _ => Duration::ZERO,
        }
    }

    fn delay_before(&self, next: &Chunk) -> Duration {
        if self.speed == 0.0 {
            return Duration::ZERO;
        }
        let Some(previous) = self.last_delivered else {
            return Duration::ZERO;
        };
        let gap = (next.received_at - previous).to_std().unwrap_or_default();
        gap.div_f64(self.speed)
    }
}

#[async_trait::async_trait]
impl ByteSource for CaptureReplaySource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let Some(next) = self.chunks.front() else {
            debug!("Reached end of replay");
            return Ok(None);
        };

        let due = match self.due {
            Some(due) => due,
            None => {
                let due = Instant::now() + self.delay_before(next);
                self.due = Some(due);
                due
            }
        };
        sleep_until(due).await;

        self.due = None;
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(None);
        };
        self.last_delivered = Some(chunk.received_at);

        trace!("Chunk {}/{}: {} bytes", self.total - self.chunks.len(), self.total, chunk.data.len());
        Ok(Some(chunk))
    }

    fn describe(&self) -> String {
        format!("replay of {}", self.name)
    }
}
