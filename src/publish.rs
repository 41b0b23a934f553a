//! Viewer-facing messages
//!
//! Outbound publications and inbound commands use the same JSON envelope the
//! timing display expects:
//!
//! ```text
//! {"event":"mode","data":{"raceMode":1}}
//! {"event":"update","data":{"racers":[...]}}
//! {"event":"finish","data":{"results":[...]}}
//!
//! {"command":"setMode","data":{"raceMode":2}}
//! {"command":"resetRace"}
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::race::Leaderboard;
use crate::types::RaceMode;
use crate::{Result, TimingError};

/// Message broadcast to every viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Publication {
    /// Active ranking rule; sent on attach and after every accepted mode change
    Mode {
        #[serde(rename = "raceMode")]
        race_mode: RaceMode,
    },
    /// Standings after an accepted detection, or empty after a reset
    Update { racers: Arc<Leaderboard> },
    /// Final standings once the active mode's finish condition holds
    Finish { results: Arc<Leaderboard> },
}

impl Publication {
    pub fn update(racers: Leaderboard) -> Self {
        Publication::Update { racers: Arc::new(racers) }
    }

    pub fn finish(results: Leaderboard) -> Self {
        Publication::Finish { results: Arc::new(results) }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Publication::Update { .. })
    }

    /// Envelope event name
    pub fn event(&self) -> &'static str {
        match self {
            Publication::Mode { .. } => "mode",
            Publication::Update { .. } => "update",
            Publication::Finish { .. } => "finish",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TimingError::parse_error(format!("{} publication", self.event()), e.to_string()))
    }
}

/// Request sent by a viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum Command {
    /// Switch the ranking rule. The raw value is checked by the race driver;
    /// anything but 1, 2 or 3 is ignored.
    SetMode {
        #[serde(rename = "raceMode")]
        race_mode: i64,
    },
    /// Forget every racer and clear viewer tables
    ResetRace,
}

impl Command {
    /// Parse one JSON command line.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| TimingError::parse_error("viewer command", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::RacerState;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    #[test]
    fn mode_envelope() {
        let publication = Publication::Mode { race_mode: RaceMode::FastestLap };
        let value: Value = serde_json::from_str(&publication.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "mode", "data": {"raceMode": 3}}));
    }

    #[test]
    fn empty_update_and_finish_envelopes() {
        let update: Value = serde_json::to_value(Publication::update(Vec::new())).unwrap();
        assert_eq!(update, json!({"event": "update", "data": {"racers": []}}));

        let finish: Value = serde_json::to_value(Publication::finish(Vec::new())).unwrap();
        assert_eq!(finish, json!({"event": "finish", "data": {"results": []}}));
    }

    #[test]
    fn update_rows_use_viewer_field_names() {
        let mut racer = RacerState::new();
        racer.record(1_000, 10_000);
        racer.record(31_000, 10_000);
        let racers = BTreeMap::from([(42, racer)]);
        let board = crate::race::rank(&racers, RaceMode::MostLaps, 5);

        let value = serde_json::to_value(Publication::update(board)).unwrap();
        let row = &value["data"]["racers"][0];
        assert_eq!(row["cardId"], 42);
        assert_eq!(row["laps"], 2);
        assert_eq!(row["position"], 1);
        assert_eq!(row["lastLapTime"], 30_000);
        assert_eq!(row["lastLapTimeFormatted"], "00:30.000");
        assert_eq!(row["bestLap"]["lap"], 1);
        assert_eq!(row["gapToLeaderFormatted"], "00:00.000");
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::from_json(r#"{"command":"setMode","data":{"raceMode":2}}"#).unwrap(),
            Command::SetMode { race_mode: 2 }
        );
        assert_eq!(
            Command::from_json(r#"{"command":"setMode","data":{"raceMode":9}}"#).unwrap(),
            Command::SetMode { race_mode: 9 }
        );
        assert_eq!(Command::from_json(r#"{"command":"resetRace"}"#).unwrap(), Command::ResetRace);
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(matches!(
            Command::from_json(r#"{"command":"startRace"}"#),
            Err(TimingError::Parse { .. })
        ));
        assert!(Command::from_json(r#"{"command":"setMode","data":{"raceMode":"2"}}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }
}
