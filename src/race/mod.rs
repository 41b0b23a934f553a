//! Race tracking and ranking.
//!
//! [`RaceTracker`] turns card detections into laps; [`rank`] orders racers
//! under the active [`RaceMode`](crate::RaceMode) and derives the gap columns
//! shown to viewers.

mod format;
mod leaderboard;
mod racer;
mod tracker;

pub use format::{ZERO_TIME, format_delta, format_lap_deficit, format_time};
pub use leaderboard::{Leaderboard, LeaderboardEntry, rank};
pub use racer::{BestLap, Crossing, RacerState};
pub use tracker::{DetectionOutcome, RaceTracker};
