//! Race session state machine

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::leaderboard::{Leaderboard, rank};
use super::racer::{Crossing, RacerState};
use crate::config::RaceConfig;
use crate::protocol::NO_CARD;
use crate::types::RaceMode;
use crate::Result;

/// Result of one accepted detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionOutcome {
    pub card_id: u32,
    pub crossing: Crossing,
    /// The finish condition of the active mode holds after this detection
    pub finished: bool,
}

/// Owns the state of the one race being timed.
///
/// Every racer is created on its first detection and kept until
/// [`RaceTracker::reset`]. The tracker is not shared: a single owner feeds it
/// detections and commands in arrival order.
#[derive(Debug, Clone)]
pub struct RaceTracker {
    racers: BTreeMap<u32, RacerState>,
    mode: RaceMode,
    lap_target: u32,
    pass_gap_ms: u64,
}

impl RaceTracker {
    pub fn new(config: &RaceConfig) -> Self {
        Self {
            racers: BTreeMap::new(),
            mode: config.initial_mode,
            lap_target: config.lap_target,
            pass_gap_ms: config.pass_gap_ms,
        }
    }

    /// Register a detection of `card_id` at `timestamp_ms`.
    ///
    /// Card id 0 is the reader's "no tag" value and returns `None` without
    /// touching any state.
    pub fn record_detection(&mut self, card_id: u32, timestamp_ms: u64) -> Option<DetectionOutcome> {
        if card_id == NO_CARD {
            return None;
        }

        let racer = self.racers.entry(card_id).or_insert_with(|| {
            debug!(card_id, "new racer");
            RacerState::new()
        });
        let crossing = racer.record(timestamp_ms, self.pass_gap_ms);

        match crossing {
            Crossing::Debounced => {}
            Crossing::Start => info!(card_id, "racer started first lap"),
            Crossing::LapCompleted { lap, time, personal_best } => {
                info!(card_id, lap, lap_time_ms = time, personal_best, "lap completed")
            }
        }

        let finished = self.is_finished(card_id);
        Some(DetectionOutcome { card_id, crossing, finished })
    }

    /// Finish condition of the active mode, evaluated after a detection of
    /// `card_id`.
    fn is_finished(&self, card_id: u32) -> bool {
        match self.mode {
            RaceMode::MostLaps => {
                self.racers.get(&card_id).is_some_and(|r| r.laps >= self.lap_target)
            }
            RaceMode::LowestTotalTime => {
                !self.racers.is_empty() && self.racers.values().all(|r| r.laps >= self.lap_target)
            }
            RaceMode::FastestLap => {
                !self.racers.is_empty() && self.racers.values().all(|r| r.best_lap.is_some())
            }
        }
    }

    /// Switch ranking rule from a raw viewer value.
    ///
    /// Values other than 1, 2 and 3 are rejected and leave the mode unchanged.
    pub fn set_mode(&mut self, raw: i64) -> Result<RaceMode> {
        let mode = RaceMode::try_from(raw)?;
        if mode != self.mode {
            info!(from = %self.mode, to = %mode, "race mode changed");
        }
        self.mode = mode;
        Ok(mode)
    }

    /// Forget every racer. Mode and settings are kept.
    pub fn reset(&mut self) {
        info!(racers = self.racers.len(), "race reset");
        self.racers.clear();
    }

    /// Current standings under the active mode
    pub fn leaderboard(&self) -> Leaderboard {
        rank(&self.racers, self.mode, self.lap_target)
    }

    pub fn racers(&self) -> &BTreeMap<u32, RacerState> {
        &self.racers
    }

    pub fn racer(&self, card_id: u32) -> Option<&RacerState> {
        self.racers.get(&card_id)
    }

    pub fn mode(&self) -> RaceMode {
        self.mode
    }

    pub fn lap_target(&self) -> u32 {
        self.lap_target
    }

    pub fn pass_gap_ms(&self) -> u64 {
        self.pass_gap_ms
    }
}
