//! RFID transponder lap timing.
//!
//! Lapgate turns the raw serial output of a lap-timing transponder reader into
//! live race standings.
//!
//! # Features
//!
//! - **Frame reassembly**: arbitrary chunk boundaries, junk bytes skipped one at a time
//! - **Validation**: XOR checksum on every frame, corrupted frames dropped and logged
//! - **Race tracking**: debounced crossings, lap times, best laps per card
//! - **Three race modes**: most laps, lowest total time, fastest single lap
//! - **Replay**: feed a recorded frame log back through the pipeline
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lapgate::{Lapgate, Publication, RaceConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> lapgate::Result<()> {
//!     let config = RaceConfig::default();
//!     let race = Lapgate::read_from("/dev/ttyUSB0", &config).await?;
//!     let mut publications = Box::pin(race.publications());
//!
//!     while let Some(publication) = publications.next().await {
//!         if let Publication::Finish { results } = &publication {
//!             println!("Winner: card {}", results[0].card_id);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Wire protocol and race logic
pub mod protocol;
pub mod race;

// Stream-based race architecture
pub mod config;
pub mod connection;
pub mod driver;
pub mod frame_log;
pub mod provider;
pub mod providers;
pub mod publish;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

pub use config::RaceConfig;
pub use connection::RaceConnection;
pub use frame_log::FrameLog;
pub use provider::{ByteSource, Chunk};
pub use publish::{Command, Publication};
pub use race::{Leaderboard, LeaderboardEntry, RaceTracker, RacerState};
pub use stream::CoalesceExt;

/// Unified entry point for race connections.
///
/// # Examples
///
/// ## Serial device
/// ```rust,no_run
/// use lapgate::{Lapgate, RaceConfig};
///
/// #[tokio::main]
/// async fn main() -> lapgate::Result<()> {
///     let race = Lapgate::read_from("/dev/ttyUSB0", &RaceConfig::default()).await?;
///     // Subscribe viewers...
///     Ok(())
/// }
/// ```
///
/// ## Frame log replay
/// ```rust,no_run
/// use lapgate::{Lapgate, RaceConfig};
///
/// #[tokio::main]
/// async fn main() -> lapgate::Result<()> {
///     let config = RaceConfig { replay_speed: 0.0, ..RaceConfig::default() };
///     let race = Lapgate::open("frames.log", &config).await?;
///     // Subscribe viewers...
///     Ok(())
/// }
/// ```
pub struct Lapgate;

impl Lapgate {
    /// Time a race from any byte source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the frame log
    /// cannot be opened.
    pub fn attach<S: ByteSource>(source: S, config: &RaceConfig) -> Result<RaceConnection> {
        RaceConnection::attach(source, config)
    }

    /// Replay a recorded frame log.
    ///
    /// Only the `Received chunk` lines are replayed; they keep their recorded
    /// timestamps so lap times match the recorded session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File does not exist or is not readable
    /// - A chunk line does not hold valid hex
    /// - The configuration is invalid
    pub async fn open<P: AsRef<std::path::Path>>(
        path: P,
        config: &RaceConfig,
    ) -> Result<RaceConnection> {
        RaceConnection::open(path, config).await
    }

    /// Read a device node as a live byte stream.
    ///
    /// The port must already be configured for the reader (baud rate, raw mode).
    pub async fn read_from<P: AsRef<std::path::Path>>(
        path: P,
        config: &RaceConfig,
    ) -> Result<RaceConnection> {
        RaceConnection::read_device(path, config).await
    }
}
