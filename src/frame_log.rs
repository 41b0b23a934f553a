//! Append-only diagnostic frame log
//!
//! One line per event, prefixed with an RFC 3339 UTC timestamp:
//!
//! ```text
//! [2026-03-01T10:15:02.114Z] Received chunk: 02014108003039...
//! [2026-03-01T10:15:02.114Z] Raw: 02 01 41 08 00 30 39 1E 00 01 50 0C | CardID: 12345
//! [2026-03-01T10:15:07.530Z] Invalid checksum: 0100EA0032001900
//! ```
//!
//! The log is write-only. [`CaptureReplaySource`](crate::providers::CaptureReplaySource)
//! can feed the `Received chunk` lines back through the pipeline.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::Frame;
use crate::{Result, TimingError};

/// Prefix of raw chunk lines
pub const CHUNK_PREFIX: &str = "Received chunk: ";

/// Lines queued for the writer task before new lines are dropped
const LINE_CAPACITY: usize = 1024;

/// Diagnostic sink; a disabled log accepts and drops every line.
///
/// Lines are handed to a writer task, so logging never waits on the disk. If
/// the writer falls `LINE_CAPACITY` lines behind, new lines are dropped and
/// counted.
#[derive(Debug)]
pub struct FrameLog {
    sink: Option<Sink>,
    dropped: u64,
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    lines: mpsc::Sender<String>,
    writer: JoinHandle<()>,
    warned: bool,
}

impl FrameLog {
    /// Open `path` for appending, creating it if needed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_capacity(path, LINE_CAPACITY)
    }

    pub(crate) fn with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TimingError::file_error(path.clone(), e))?;
        debug!(path = %path.display(), "frame log opened");

        let (lines, rx) = mpsc::channel(capacity);
        let writer = tokio::spawn(write_lines(path.clone(), File::from_std(file), rx));
        Ok(Self { sink: Some(Sink { path, lines, writer, warned: false }), dropped: 0 })
    }

    pub fn disabled() -> Self {
        Self { sink: None, dropped: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Lines lost because the writer was behind or had failed
    pub fn dropped_lines(&self) -> u64 {
        self.dropped
    }

    pub fn chunk(&mut self, at: DateTime<Utc>, bytes: &[u8]) {
        self.write(at, format_args!("{CHUNK_PREFIX}{}", hex::encode_upper(bytes)));
    }

    pub fn checkpoint(&mut self, at: DateTime<Utc>, frame: &Frame, card_id: u32) {
        self.write(at, format_args!("Raw: {} | CardID: {card_id}", frame.to_spaced_hex()));
    }

    pub fn invalid_checksum(&mut self, at: DateTime<Utc>, frame: &Frame) {
        self.write(at, format_args!("Invalid checksum: {}", frame.to_hex()));
    }

    /// Stop accepting lines and wait until everything queued is on disk.
    pub async fn close(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        drop(sink.lines);
        if let Err(e) = sink.writer.await {
            warn!(path = %sink.path.display(), error = %e, "frame log writer task failed");
        }
    }

    /// Never waits; a full queue drops the line.
    fn write(&mut self, at: DateTime<Utc>, message: std::fmt::Arguments<'_>) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        match sink.lines.try_send(format!("[{stamp}] {message}\n")) {
            Ok(()) => sink.warned = false,
            Err(e) => {
                self.dropped += 1;
                if !sink.warned {
                    let reason = match e {
                        mpsc::error::TrySendError::Full(_) => "writer behind",
                        mpsc::error::TrySendError::Closed(_) => "writer stopped",
                    };
                    warn!(path = %sink.path.display(), reason, "dropping frame log lines");
                    sink.warned = true;
                }
            }
        }
    }
}

/// Writer task. Flushes whenever the queue runs dry; stops at the first write error.
async fn write_lines(path: PathBuf, file: File, mut lines: mpsc::Receiver<String>) {
    let mut writer = BufWriter::new(file);

    while let Some(line) = lines.recv().await {
        let mut result = writer.write_all(line.as_bytes()).await;
        if result.is_ok() && lines.is_empty() {
            result = writer.flush().await;
        }
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "frame log write failed");
            return;
        }
    }

    if let Err(e) = writer.flush().await {
        warn!(path = %path.display(), error = %e, "frame log flush failed");
    }
}

/// Split a log line into its timestamp and message.
pub fn parse_line(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, message) = rest.split_once("] ")?;
    let at = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    Some((at, message))
}
