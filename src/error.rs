//! Error types for lap timing.
//!
//! Nothing in the ingest path is fatal: incomplete frames are buffered, junk
//! bytes are skipped and corrupted frames are dropped. The errors here surface
//! at the edges instead: byte sources failing, configuration files that do not
//! parse, viewer commands that cannot be delivered.
//!
//! ## Error Categories
//!
//! - **Source Errors**: The byte source (reader, device, replay file) failed
//! - **File Errors**: Opening configuration, capture or log files
//! - **Parse Errors**: Configuration YAML or capture log lines
//! - **Frame Errors**: Malformed or checksum-failing frames handed to the decoder
//! - **Command Errors**: Invalid race modes, closed command channels
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use lapgate::TimingError;
//!
//! let error = TimingError::source_failed("serial reader went away");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lap timing operations.
pub type Result<T, E = TimingError> = std::result::Result<T, E>;

/// Main error type for lap timing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimingError {
    #[error("Byte source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Race mode {value} is not one of 1, 2 or 3")]
    InvalidRaceMode { value: i64 },

    #[error("Malformed frame with header {header:#04x}: expected {expected} bytes, got {actual}")]
    MalformedFrame { header: u8, expected: usize, actual: usize },

    #[error("Checksum mismatch: frame carries {carried:#04x}, computed {computed:#04x}")]
    Checksum { carried: u8, computed: u8 },

    #[error("The {channel} channel is closed")]
    ChannelClosed { channel: &'static str },
}

impl TimingError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TimingError::Source { .. } => true,
            TimingError::File { .. } => false,
            TimingError::Parse { .. } => false,
            TimingError::Config { .. } => false,
            TimingError::InvalidRaceMode { .. } => false,
            TimingError::MalformedFrame { .. } => false,
            TimingError::Checksum { .. } => false,
            TimingError::ChannelClosed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TimingError::Source { .. } => vec![
                "Check the reader is powered and the cable is seated",
                "Verify the device path still exists",
                "Reopen the source and attach a new connection",
            ],
            TimingError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
                "Ensure the parent directory exists for log files",
            ],
            TimingError::Parse { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Verify capture logs were written by lapgate",
            ],
            TimingError::Config { .. } => vec![
                "Use a lap target of at least 1",
                "Use a positive publication capacity and replay speed",
            ],
            TimingError::InvalidRaceMode { .. } => vec![
                "Use race mode 1 (most laps), 2 (lowest total time) or 3 (fastest lap)",
            ],
            TimingError::MalformedFrame { .. } => vec![
                "Only decode frames produced by the frame reassembler",
            ],
            TimingError::Checksum { .. } => vec![
                "Check for electrical noise on the serial line",
                "Corrupted frames cannot be recovered; wait for the next pass",
            ],
            TimingError::ChannelClosed { .. } => vec![
                "The race driver has stopped; attach a new connection",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TimingError::File { path, source }
    }

    /// Helper constructor for byte source errors.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        TimingError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for byte source errors with an underlying cause.
    pub fn source_failed_with(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TimingError::Source { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TimingError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        TimingError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for TimingError {
    fn from(err: std::io::Error) -> Self {
        TimingError::source_failed_with("I/O error", Box::new(err))
    }
}

impl From<serde_yaml_ng::Error> for TimingError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TimingError::parse_error("configuration YAML", err.to_string())
    }
}
