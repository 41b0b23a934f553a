//! Race mode selection

use serde::{Deserialize, Serialize};

use crate::TimingError;

/// Ranking and finish rule for the race.
///
/// Serialized as its wire number (`1`, `2` or `3`). Any other number is
/// rejected by `TryFrom`, so ranking code only ever sees a valid mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum RaceMode {
    /// Mode 1: most laps, then fastest cumulative time. First to the lap
    /// target ends the race.
    #[default]
    MostLaps,
    /// Mode 2: finishers first, then lowest cumulative time. Ends when every
    /// racer reaches the lap target.
    LowestTotalTime,
    /// Mode 3: fastest single lap. Ends when every racer has a completed lap.
    FastestLap,
}

impl RaceMode {
    pub const ALL: [RaceMode; 3] =
        [RaceMode::MostLaps, RaceMode::LowestTotalTime, RaceMode::FastestLap];

    /// Wire number of this mode
    pub fn number(self) -> u8 {
        match self {
            RaceMode::MostLaps => 1,
            RaceMode::LowestTotalTime => 2,
            RaceMode::FastestLap => 3,
        }
    }
}

impl From<RaceMode> for u8 {
    fn from(mode: RaceMode) -> Self {
        mode.number()
    }
}

impl TryFrom<i64> for RaceMode {
    type Error = TimingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RaceMode::MostLaps),
            2 => Ok(RaceMode::LowestTotalTime),
            3 => Ok(RaceMode::FastestLap),
            other => Err(TimingError::InvalidRaceMode { value: other }),
        }
    }
}

impl std::fmt::Display for RaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RaceMode::MostLaps => "most laps",
            RaceMode::LowestTotalTime => "lowest total time",
            RaceMode::FastestLap => "fastest lap",
        };
        write!(f, "{} ({})", self.number(), name)
    }
}
