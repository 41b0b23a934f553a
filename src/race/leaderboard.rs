//! Leaderboard ranking
//!
//! Ranking is recomputed from scratch for every snapshot. Races run with a
//! handful of transponders, so a full sort per detection is cheaper than
//! keeping an incremental order correct across mode changes.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::format::{format_delta, format_lap_deficit, format_time};
use super::racer::RacerState;
use crate::types::RaceMode;

/// One ranked row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub card_id: u32,
    #[serde(flatten)]
    pub racer: RacerState,
    /// 1-based rank
    pub position: usize,
    /// Milliseconds behind the leader. `None` when the gap is counted in laps
    /// or the racer has no time to compare.
    pub gap_to_leader: Option<i64>,
    /// Milliseconds behind the racer directly ahead, same rules as `gap_to_leader`
    pub interval: Option<i64>,
    pub last_lap_time_formatted: String,
    pub total_time_formatted: String,
    pub gap_to_leader_formatted: String,
    pub interval_formatted: String,
}

/// Ordered standings
pub type Leaderboard = Vec<LeaderboardEntry>;

/// Rank every racer under `mode`.
///
/// `lap_target` only matters for [`RaceMode::LowestTotalTime`], where racers
/// that reached it sort ahead of those still running. Ties keep card id order.
pub fn rank(racers: &BTreeMap<u32, RacerState>, mode: RaceMode, lap_target: u32) -> Leaderboard {
    let mut order: Vec<(u32, &RacerState)> = racers.iter().map(|(&id, r)| (id, r)).collect();
    order.sort_by(|(_, a), (_, b)| compare(a, b, mode, lap_target));

    let Some(&(_, leader)) = order.first() else {
        return Vec::new();
    };

    order
        .iter()
        .enumerate()
        .map(|(i, &(card_id, racer))| {
            let ahead = if i == 0 { None } else { Some(order[i - 1].1) };
            let (gap_to_leader, interval, gap_to_leader_formatted, interval_formatted) =
                match mode {
                    RaceMode::FastestLap => time_gaps(racer, leader, ahead, RacerState::best_lap_time),
                    RaceMode::MostLaps | RaceMode::LowestTotalTime => {
                        let deficit = leader.laps.saturating_sub(racer.laps);
                        if deficit > 0 {
                            let text = format_lap_deficit(deficit);
                            (None, None, text.clone(), text)
                        } else {
                            time_gaps(racer, leader, ahead, |r| Some(r.total_time))
                        }
                    }
                };

            LeaderboardEntry {
                card_id,
                racer: racer.clone(),
                position: i + 1,
                gap_to_leader,
                interval,
                last_lap_time_formatted: format_time(racer.last_lap_time),
                total_time_formatted: format_time(racer.total_time),
                gap_to_leader_formatted,
                interval_formatted,
            }
        })
        .collect()
}

fn compare(a: &RacerState, b: &RacerState, mode: RaceMode, lap_target: u32) -> Ordering {
    match mode {
        RaceMode::MostLaps => b.laps.cmp(&a.laps).then(a.total_time.cmp(&b.total_time)),
        RaceMode::LowestTotalTime => {
            let a_done = a.laps >= lap_target;
            let b_done = b.laps >= lap_target;
            b_done.cmp(&a_done).then(a.total_time.cmp(&b.total_time))
        }
        // No completed lap counts as infinitely slow.
        RaceMode::FastestLap => match (a.best_lap_time(), b.best_lap_time()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

type Gaps = (Option<i64>, Option<i64>, String, String);

/// Time-based gap and interval using `metric` as the compared value.
fn time_gaps(
    racer: &RacerState,
    leader: &RacerState,
    ahead: Option<&RacerState>,
    metric: impl Fn(&RacerState) -> Option<u64>,
) -> Gaps {
    let own = metric(racer).map(signed);
    let leader_value = metric(leader).map(signed).unwrap_or(0);

    let gap = own.map(|v| v - leader_value);
    let interval = match ahead {
        None => Some(0),
        Some(ahead) => own.map(|v| v - metric(ahead).map(signed).unwrap_or(v)),
    };

    (gap, interval, format_delta(gap), format_delta(interval))
}

fn signed(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::format::ZERO_TIME;

    const GAP: u64 = 10_000;

    /// Racer whose crossings happen at the given timestamps
    fn racer(crossings: &[u64]) -> RacerState {
        let mut r = RacerState::new();
        for &ts in crossings {
            r.record(ts, GAP);
        }
        r
    }

    fn board(entries: &[(u32, RacerState)]) -> BTreeMap<u32, RacerState> {
        entries.iter().cloned().collect()
    }

    fn ids(leaderboard: &Leaderboard) -> Vec<u32> {
        leaderboard.iter().map(|e| e.card_id).collect()
    }

    #[test]
    fn empty_board_ranks_to_empty_list() {
        for mode in RaceMode::ALL {
            assert!(rank(&BTreeMap::new(), mode, 5).is_empty());
        }
    }

    #[test]
    fn most_laps_then_total_time() {
        let racers = board(&[
            (1, racer(&[0, 20_000, 40_000])),
            (2, racer(&[0, 15_000, 30_000, 45_000])),
            (3, racer(&[0, 18_000, 36_000])),
        ]);

        let lb = rank(&racers, RaceMode::MostLaps, 5);
        assert_eq!(ids(&lb), vec![2, 3, 1]);
        assert_eq!(lb[0].position, 1);
        assert_eq!(lb[0].gap_to_leader_formatted, ZERO_TIME);
        assert_eq!(lb[0].interval, Some(0));

        // One lap down on the leader
        assert_eq!(lb[1].gap_to_leader_formatted, "+1 Lap");
        assert_eq!(lb[1].interval_formatted, "+1 Lap");
        assert_eq!(lb[1].gap_to_leader, None);

        // Racer 1 is also one lap down; its gap counts laps, not time.
        assert_eq!(lb[2].gap_to_leader_formatted, "+1 Lap");
    }

    #[test]
    fn same_lap_gaps_use_total_time() {
        let racers = board(&[(1, racer(&[0, 30_000, 60_000])), (2, racer(&[0, 31_000, 62_500]))]);

        let lb = rank(&racers, RaceMode::MostLaps, 5);
        assert_eq!(ids(&lb), vec![1, 2]);
        assert_eq!(lb[1].gap_to_leader, Some(2_500));
        assert_eq!(lb[1].interval, Some(2_500));
        assert_eq!(lb[1].gap_to_leader_formatted, "00:02.500");
        assert_eq!(lb[1].total_time_formatted, "01:02.500");
        assert_eq!(lb[1].last_lap_time_formatted, "00:31.500");
    }

    #[test]
    fn lowest_total_time_puts_finishers_first() {
        // Racer 1 finished slowly; racer 2 is quicker but one lap short.
        let racers = board(&[
            (1, racer(&[0, 20_000, 40_000, 60_000])),
            (2, racer(&[0, 15_000, 30_000])),
        ]);

        let lb = rank(&racers, RaceMode::LowestTotalTime, 4);
        assert_eq!(ids(&lb), vec![1, 2]);
        assert_eq!(lb[1].gap_to_leader_formatted, "+1 Lap");
    }

    #[test]
    fn lowest_total_time_among_finishers() {
        let racers = board(&[(1, racer(&[0, 30_000, 60_000])), (2, racer(&[0, 27_500, 55_000]))]);

        let lb = rank(&racers, RaceMode::LowestTotalTime, 3);
        assert_eq!(ids(&lb), vec![2, 1]);
        assert_eq!(lb[1].gap_to_leader, Some(5_000));
        assert_eq!(lb[1].gap_to_leader_formatted, "00:05.000");
    }

    #[test]
    fn without_finishers_total_time_decides() {
        // Nobody finished: racer 2 leads on total time although racer 1 has a lap more.
        let racers = board(&[(1, racer(&[0, 20_000, 40_000])), (2, racer(&[0, 15_000]))]);

        let lb = rank(&racers, RaceMode::LowestTotalTime, 10);
        assert_eq!(ids(&lb), vec![2, 1]);
        assert_eq!(lb[1].gap_to_leader, Some(25_000));

        let racers = board(&[(1, racer(&[0, 12_000, 24_000])), (2, racer(&[0, 30_000]))]);
        let lb = rank(&racers, RaceMode::LowestTotalTime, 10);
        assert_eq!(ids(&lb), vec![1, 2]);
        assert_eq!(lb[1].gap_to_leader_formatted, "+1 Lap");
    }

    #[test]
    fn fastest_lap_ranking_and_gaps() {
        let racers = board(&[
            (1, racer(&[0, 20_000, 49_000])),
            (2, racer(&[0, 28_000])),
            (3, racer(&[0])),
        ]);

        let lb = rank(&racers, RaceMode::FastestLap, 5);
        assert_eq!(ids(&lb), vec![1, 2, 3]);
        assert_eq!(lb[0].gap_to_leader_formatted, ZERO_TIME);
        assert_eq!(lb[1].gap_to_leader, Some(8_000));
        assert_eq!(lb[1].interval, Some(8_000));

        // No completed lap: sorts last, gap renders as zero.
        assert_eq!(lb[2].card_id, 3);
        assert_eq!(lb[2].gap_to_leader, None);
        assert_eq!(lb[2].interval, None);
        assert_eq!(lb[2].gap_to_leader_formatted, ZERO_TIME);
    }

    #[test]
    fn rank_does_not_touch_racer_fields() {
        let racers = board(&[(9, racer(&[0, 25_000]))]);
        let lb = rank(&racers, RaceMode::MostLaps, 5);
        assert_eq!(lb[0].racer, racers[&9]);
    }

    #[test]
    fn entries_serialize_flat_camel_case() {
        let racers = board(&[(4, racer(&[0, 25_000]))]);
        let lb = rank(&racers, RaceMode::FastestLap, 5);
        let json = serde_json::to_value(&lb[0]).unwrap();

        assert_eq!(json["cardId"], 4);
        assert_eq!(json["laps"], 2);
        assert_eq!(json["position"], 1);
        assert_eq!(json["bestLap"]["lap"], 1);
        assert_eq!(json["bestLap"]["timeFormatted"], "00:25.000");
        assert_eq!(json["gapToLeaderFormatted"], ZERO_TIME);
    }
}
