//! Driver spawns and manages the race processing task

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::RaceConfig;
use crate::frame_log::FrameLog;
use crate::protocol::{DecodedFrame, FrameReassembler, decode};
use crate::provider::{ByteSource, Chunk};
use crate::publish::{Command, Publication};
use crate::race::{Leaderboard, RaceTracker};
use crate::types::RaceMode;

/// Commands buffered between viewers and the driver
const COMMAND_CAPACITY: usize = 32;

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Ordered publication log. Use [`broadcast::Receiver::resubscribe`] to add viewers;
    /// the channel closes when the driver stops.
    pub publications: broadcast::Receiver<Publication>,
    /// Latest standings
    pub leaderboard: watch::Receiver<Arc<Leaderboard>>,
    /// Active ranking rule
    pub mode: watch::Receiver<RaceMode>,
    /// Viewer commands, applied in arrival order between chunks
    pub commands: mpsc::Sender<Command>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

struct Outputs {
    publications: broadcast::Sender<Publication>,
    leaderboard: watch::Sender<Arc<Leaderboard>>,
    mode: watch::Sender<RaceMode>,
}

impl Outputs {
    /// Publishing never waits on viewers; a broadcast with no receivers is dropped.
    fn publish(&self, publication: Publication) {
        let _ = self.publications.send(publication);
    }
}

/// Driver spawns and manages the race processing task
///
/// One task owns the byte source, the frame reassembler, the race tracker and
/// the frame log. Each chunk is processed to completion, publications
/// included, before the next command or chunk is looked at, so a reset can
/// never interleave with a detection.
pub struct Driver;

impl Driver {
    /// Spawn the driver task for the given byte source
    pub fn spawn<S>(source: S, config: &RaceConfig, frame_log: FrameLog) -> DriverChannels
    where
        S: ByteSource,
    {
        let tracker = RaceTracker::new(config);

        let (publication_tx, publication_rx) = broadcast::channel(config.publication_capacity);
        let (leaderboard_tx, leaderboard_rx) = watch::channel(Arc::new(Vec::new()));
        let (mode_tx, mode_rx) = watch::channel(tracker.mode());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let outputs =
            Outputs { publications: publication_tx, leaderboard: leaderboard_tx, mode: mode_tx };

        tokio::spawn(async move {
            let pipeline = Pipeline { reassembler: FrameReassembler::new(), tracker, frame_log, outputs };
            Self::race_task(source, pipeline, command_rx, cancel_task).await;
        });

        DriverChannels {
            publications: publication_rx,
            leaderboard: leaderboard_rx,
            mode: mode_rx,
            commands: command_tx,
            cancel,
        }
    }

    /// Race task - reads chunks and applies viewer commands
    async fn race_task<S>(
        mut source: S,
        mut pipeline: Pipeline,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) where
        S: ByteSource,
    {
        info!("Race task started reading from {}", source.describe());
        let mut chunk_count = 0u64;
        let mut error_count = 0u32;
        let mut commands_open = true;
        const MAX_ERRORS: u32 = 10;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Race task cancelled");
                    break;
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => pipeline.apply_command(command),
                        None => {
                            debug!("All command senders dropped");
                            commands_open = false;
                        }
                    }
                    continue;
                }
                result = source.next_chunk() => result,
            };

            match result {
                Ok(Some(chunk)) => {
                    chunk_count += 1;
                    error_count = 0;
                    trace!("Chunk {}: {} bytes", chunk_count, chunk.data.len());
                    pipeline.process_chunk(&chunk);
                }
                Ok(None) => {
                    info!("Byte source ended after {} chunks", chunk_count);
                    break;
                }
                Err(e) => {
                    // Source error - don't crash on transient failures
                    error_count += 1;
                    error!("Byte source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS || !e.is_retryable() {
                        error!("Giving up on {}", source.describe());
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        drop(commands);
        // Viewers see their streams end only once the frame log is on disk.
        pipeline.frame_log.close().await;
        info!(
            chunks = chunk_count,
            frames = pipeline.reassembler.frames_emitted(),
            discarded = pipeline.reassembler.bytes_discarded(),
            dropped_log_lines = pipeline.frame_log.dropped_lines(),
            "Race task ended"
        );
    }
}

/// Everything the race task mutates
struct Pipeline {
    reassembler: FrameReassembler,
    tracker: RaceTracker,
    frame_log: FrameLog,
    outputs: Outputs,
}

impl Pipeline {
    fn process_chunk(&mut self, chunk: &Chunk) {
        self.frame_log.chunk(chunk.received_at, &chunk.data);

        for frame in self.reassembler.push(&chunk.data) {
            if !frame.is_valid() {
                debug!(frame = %frame.to_hex(), "dropping frame with invalid checksum");
                self.frame_log.invalid_checksum(chunk.received_at, &frame);
                continue;
            }

            let decoded = match decode(&frame) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Failed to decode frame {}: {}", frame.to_hex(), e);
                    continue;
                }
            };

            match decoded {
                DecodedFrame::Checkpoint(checkpoint) => {
                    if !checkpoint.has_card() {
                        trace!(sense_id = checkpoint.sense_id, "checkpoint frame without a card");
                        continue;
                    }
                    self.frame_log.checkpoint(chunk.received_at, &frame, checkpoint.card_id);
                    self.detect(checkpoint.card_id, chunk.timestamp_ms());
                }
                DecodedFrame::Telemetry(telemetry) => {
                    debug!(
                        voltage = telemetry.voltage,
                        current_ma = telemetry.current_ma,
                        temperature_c = telemetry.temperature_c,
                        "reader telemetry"
                    );
                }
            }
        }
    }

    fn detect(&mut self, card_id: u32, timestamp_ms: u64) {
        let Some(outcome) = self.tracker.record_detection(card_id, timestamp_ms) else {
            return;
        };

        let standings = Arc::new(self.tracker.leaderboard());
        self.outputs.leaderboard.send_replace(Arc::clone(&standings));
        self.outputs.publish(Publication::Update { racers: Arc::clone(&standings) });

        if outcome.finished {
            info!(card_id, mode = %self.tracker.mode(), "finish condition reached");
            self.outputs.publish(Publication::Finish { results: standings });
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SetMode { race_mode } => match self.tracker.set_mode(race_mode) {
                Ok(mode) => {
                    self.outputs.mode.send_replace(mode);
                    let standings = Arc::new(self.tracker.leaderboard());
                    self.outputs.leaderboard.send_replace(standings);
                    self.outputs.publish(Publication::Mode { race_mode: mode });
                }
                Err(e) => warn!("Ignoring mode change: {}", e),
            },
            Command::ResetRace => {
                self.tracker.reset();
                let empty: Arc<Leaderboard> = Arc::new(Vec::new());
                self.outputs.leaderboard.send_replace(Arc::clone(&empty));
                self.outputs.publish(Publication::Update { racers: Arc::clone(&empty) });
                self.outputs.publish(Publication::Finish { results: empty });
            }
        }
    }
}
