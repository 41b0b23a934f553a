//! Race connection over any byte source

use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RaceConfig;
use crate::driver::Driver;
use crate::frame_log::FrameLog;
use crate::provider::ByteSource;
use crate::providers::{CaptureReplaySource, ReaderSource};
use crate::publish::{Command, Publication};
use crate::race::Leaderboard;
use crate::types::RaceMode;
use crate::{Result, TimingError};

/// Handle to a running race.
///
/// Any number of viewers can subscribe through one connection. Dropping the
/// connection stops the race task.
pub struct RaceConnection {
    /// Receiver created together with the race task, along with the mode it
    /// started in. The first viewer takes it and sees every publication.
    first_viewer: Mutex<Option<(RaceMode, broadcast::Receiver<Publication>)>>,

    /// Template receiver, resubscribed for every later viewer
    publications: broadcast::Receiver<Publication>,

    leaderboard: watch::Receiver<Arc<Leaderboard>>,

    mode: watch::Receiver<RaceMode>,

    commands: mpsc::Sender<Command>,

    /// Byte source description for logs
    source: String,

    /// Cancellation token for stopping the race task
    cancel: CancellationToken,
}

impl RaceConnection {
    /// Start timing a race from `source`.
    ///
    /// Opens the frame log named in `config`, if any. Must be called from
    /// within a tokio runtime.
    pub fn attach<S: ByteSource>(source: S, config: &RaceConfig) -> Result<Self> {
        config.validate()?;
        let frame_log = match &config.frame_log {
            Some(path) => FrameLog::open(path)?,
            None => FrameLog::disabled(),
        };

        let description = source.describe();
        let channels = Driver::spawn(source, config, frame_log);

        info!(
            source = %description,
            mode = %config.initial_mode,
            lap_target = config.lap_target,
            pass_gap_ms = config.pass_gap_ms,
            "Race connection attached"
        );

        let publications = channels.publications.resubscribe();
        Ok(Self {
            first_viewer: Mutex::new(Some((config.initial_mode, channels.publications))),
            publications,
            leaderboard: channels.leaderboard,
            mode: channels.mode,
            commands: channels.commands,
            source: description,
            cancel: channels.cancel,
        })
    }

    /// Replay a recorded frame log at `config.replay_speed`.
    pub async fn open<P: AsRef<Path>>(path: P, config: &RaceConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening frame log for replay: {}", path.display());

        let source = CaptureReplaySource::open(path).await?.with_speed(config.replay_speed);
        Self::attach(source, config)
    }

    /// Read a device node (or any readable file) as a live byte stream.
    pub async fn read_device<P: AsRef<Path>>(path: P, config: &RaceConfig) -> Result<Self> {
        let source = ReaderSource::open(path).await?;
        Self::attach(source, config)
    }

    /// Publications for one viewer.
    ///
    /// Starts with a mode, then follows the publication log. The first viewer
    /// gets the starting mode and everything published since the race was
    /// attached; later viewers get the active mode and what follows it.
    /// A viewer that falls more than the configured capacity behind skips
    /// the publications it missed. The stream ends when the race task stops.
    pub fn publications(&self) -> impl Stream<Item = Publication> + Send + 'static {
        let first = self.first_viewer.lock().unwrap_or_else(PoisonError::into_inner).take();
        let (mode, rx) = match first {
            Some(first) => first,
            None => {
                let rx = self.publications.resubscribe();
                (*self.mode.borrow(), rx)
            }
        };
        let current = Publication::Mode { race_mode: mode };

        let live = BroadcastStream::new(rx).filter_map(|result| async move {
            match result {
                Ok(publication) => Some(publication),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "viewer fell behind, skipping publications");
                    None
                }
            }
        });

        futures::stream::once(async move { current }).chain(live)
    }

    /// Standings as a stream
    ///
    /// Yields the current standings immediately, then every change. Only the
    /// latest value is kept for slow consumers.
    pub fn leaderboard_updates(&self) -> impl Stream<Item = Arc<Leaderboard>> + Send + 'static {
        WatchStream::new(self.leaderboard.clone())
    }

    pub fn current_leaderboard(&self) -> Arc<Leaderboard> {
        Arc::clone(&self.leaderboard.borrow())
    }

    pub fn current_mode(&self) -> RaceMode {
        *self.mode.borrow()
    }

    /// Switch the ranking rule.
    ///
    /// Values other than 1, 2 and 3 are rejected here and never reach the race.
    pub async fn set_mode(&self, raw: i64) -> Result<RaceMode> {
        let mode = RaceMode::try_from(raw)?;
        self.send(Command::SetMode { race_mode: raw }).await?;
        Ok(mode)
    }

    /// Forget every racer.
    pub async fn reset(&self) -> Result<()> {
        self.send(Command::ResetRace).await
    }

    /// Sender for raw viewer commands, for transports that forward them as-is
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    /// Whether the race task is still consuming its source
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TimingError::ChannelClosed { channel: "command" })
    }
}

impl Drop for RaceConnection {
    fn drop(&mut self) {
        debug!("Dropping race connection for {}", self.source);
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
