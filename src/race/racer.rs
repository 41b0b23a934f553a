//! Per-card race state

use serde::{Serialize, Serializer};

use super::format::format_time;

/// Fastest completed lap of one racer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestLap {
    /// Number of the lap that was completed, counting from 1
    pub lap: u32,
    /// Lap duration in milliseconds
    pub time: u64,
    pub time_formatted: String,
}

impl BestLap {
    fn new(lap: u32, time: u64) -> Self {
        Self { lap, time, time_formatted: format_time(time) }
    }
}

/// What a single detection did to a racer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Inside the pass gap of the last crossing; only hit counters moved
    Debounced,
    /// First accepted crossing for this card; the first lap starts now
    Start,
    /// A lap was closed and the next one opened
    LapCompleted { lap: u32, time: u64, personal_best: bool },
}

impl Crossing {
    pub fn is_boundary(self) -> bool {
        !matches!(self, Crossing::Debounced)
    }
}

/// Race state for one transponder card.
///
/// `laps` counts accepted line crossings, so it is one ahead of the number
/// of completed laps once the racer has crossed at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerState {
    pub laps: u32,
    pub hits: u64,
    pub hits_this_lap: u32,
    pub lap_hits: Vec<u32>,
    pub last_seen: u64,
    #[serde(serialize_with = "zero_when_absent")]
    pub last_lap_cross: Option<u64>,
    pub last_lap_time: u64,
    pub total_time: u64,
    pub times: Vec<u64>,
    pub best_lap: Option<BestLap>,
}

impl RacerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one raw detection at `timestamp_ms`.
    ///
    /// A crossing is accepted only when more than `pass_gap_ms` has elapsed
    /// since the previous accepted crossing. Detections inside the gap come from
    /// the same physical pass and only bump the hit counters.
    pub fn record(&mut self, timestamp_ms: u64, pass_gap_ms: u64) -> Crossing {
        self.hits += 1;
        self.hits_this_lap += 1;
        self.last_seen = timestamp_ms;

        let crossing = match self.last_lap_cross {
            Some(last) if timestamp_ms.saturating_sub(last) <= pass_gap_ms => {
                return Crossing::Debounced;
            }
            Some(last) if self.laps > 0 => self.complete_lap(timestamp_ms - last),
            _ => Crossing::Start,
        };

        self.laps += 1;
        self.last_lap_cross = Some(timestamp_ms);
        crossing
    }

    fn complete_lap(&mut self, lap_time: u64) -> Crossing {
        self.last_lap_time = lap_time;
        self.total_time += lap_time;
        self.times.push(lap_time);
        self.lap_hits.push(self.hits_this_lap);
        self.hits_this_lap = 0;

        let lap = self.laps;
        let personal_best = self.best_lap.as_ref().is_none_or(|best| lap_time < best.time);
        if personal_best {
            self.best_lap = Some(BestLap::new(lap, lap_time));
        }

        Crossing::LapCompleted { lap, time: lap_time, personal_best }
    }

    /// Number of laps actually timed
    pub fn completed_laps(&self) -> usize {
        self.times.len()
    }

    pub fn best_lap_time(&self) -> Option<u64> {
        self.best_lap.as_ref().map(|best| best.time)
    }
}

fn zero_when_absent<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.unwrap_or(0))
}
