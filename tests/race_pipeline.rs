//! End-to-end races driven through raw reader bytes.

use chrono::{DateTime, TimeDelta, Utc};
use futures::{Stream, StreamExt};
use std::time::Duration;

use lapgate::protocol::seal;
use lapgate::providers::{ChannelSource, ChunkSender};
use lapgate::{Chunk, Lapgate, Leaderboard, Publication, RaceConfig, RaceMode};

fn checkpoint(card_id: u32) -> Vec<u8> {
    let id = card_id.to_be_bytes();
    seal(vec![0x02, 0x01, 0x41, 0x08, id[1], id[2], id[3], 0x1E, 0x00, 0x01, 0x50])
}

fn at(ms: u64) -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::milliseconds(1_760_000_000_000 + ms as i64)
}

/// Send crossings `(card, ms)` as whole frames, one chunk each.
async fn run(tx: &ChunkSender, crossings: &[(u32, u64)]) {
    for &(card_id, ms) in crossings {
        tx.send(Chunk::new(checkpoint(card_id), at(ms))).await.unwrap();
    }
}

fn laps(card_id: u32, start: u64, lap_ms: u64, crossings: u64) -> Vec<(u32, u64)> {
    (0..crossings).map(|i| (card_id, start + i * lap_ms)).collect()
}

fn merged(mut a: Vec<(u32, u64)>, b: Vec<(u32, u64)>) -> Vec<(u32, u64)> {
    a.extend(b);
    a.sort_by_key(|&(card, ms)| (ms, card));
    a
}

async fn first_finish<S: Stream<Item = Publication> + Unpin>(stream: &mut S) -> Leaderboard {
    loop {
        let publication = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for finish")
            .expect("stream ended before finish");
        if let Publication::Finish { results } = publication {
            return results.as_ref().clone();
        }
    }
}

async fn last_update<S: Stream<Item = Publication> + Unpin>(stream: &mut S) -> Leaderboard {
    let mut last = Vec::new();
    while let Some(publication) =
        tokio::time::timeout(Duration::from_secs(5), stream.next()).await.expect("stream stalled")
    {
        if let Publication::Update { racers } = publication {
            last = racers.as_ref().clone();
        }
    }
    last
}

fn config(mode: RaceMode) -> RaceConfig {
    RaceConfig { initial_mode: mode, ..RaceConfig::default() }
}

#[tokio::test]
async fn most_laps_leader_finishes_first() {
    let (tx, source) = ChannelSource::new(64);
    let race = Lapgate::attach(source, &config(RaceMode::MostLaps)).unwrap();
    let mut stream = Box::pin(race.publications());

    // A laps in 20s, B in 25s; A reaches five crossings first
    run(&tx, &merged(laps(1, 0, 20_000, 5), laps(2, 500, 25_000, 4))).await;

    let results = first_finish(&mut stream).await;
    assert_eq!(results[0].card_id, 1);
    assert_eq!(results[0].racer.laps, 5);
    assert_eq!(results[0].gap_to_leader_formatted, "00:00.000");
    assert_eq!(results[0].total_time_formatted, "01:20.000");
    assert_eq!(results[1].card_id, 2);
    assert_eq!(results[1].gap_to_leader_formatted, "+1 Lap");
}

#[tokio::test]
async fn lowest_total_time_waits_for_every_finisher() {
    let (tx, source) = ChannelSource::new(64);
    let race = Lapgate::attach(source, &config(RaceMode::LowestTotalTime)).unwrap();
    let mut stream = Box::pin(race.publications());

    run(&tx, &merged(laps(1, 0, 15_000, 5), laps(2, 0, 13_750, 5))).await;

    let results = first_finish(&mut stream).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].card_id, 2);
    assert_eq!(results[0].racer.total_time, 55_000);
    assert_eq!(results[1].card_id, 1);
    assert_eq!(results[1].racer.total_time, 60_000);
    assert_eq!(results[1].gap_to_leader_formatted, "00:05.000");
    assert_eq!(results[1].interval_formatted, "00:05.000");
}

#[tokio::test]
async fn fastest_lap_finishes_once_everyone_has_a_lap() {
    let (tx, source) = ChannelSource::new(64);
    let race_config = RaceConfig { pass_gap_ms: 5_000, ..config(RaceMode::FastestLap) };
    let race = Lapgate::attach(source, &race_config).unwrap();
    let mut stream = Box::pin(race.publications());

    // B laps in 8s. A's first lap takes 12s, its second 9s.
    run(&tx, &[(1, 0), (2, 0), (2, 8_000), (1, 12_000), (1, 21_000)]).await;

    let results = first_finish(&mut stream).await;
    assert_eq!(results[0].card_id, 2);
    assert_eq!(results[0].gap_to_leader_formatted, "00:00.000");
    assert_eq!(results[1].card_id, 1);
    assert_eq!(results[1].racer.best_lap_time(), Some(12_000));
    assert_eq!(results[1].gap_to_leader_formatted, "00:04.000");

    // The finish condition keeps holding; the next one carries A's 9s lap
    let results = first_finish(&mut stream).await;
    assert_eq!(results[1].racer.best_lap_time(), Some(9_000));
    assert_eq!(results[1].gap_to_leader_formatted, "00:01.000");
}

#[tokio::test]
async fn junk_and_split_chunks_still_count_laps() {
    let (tx, source) = ChannelSource::new(64);
    let race = Lapgate::attach(source, &RaceConfig::default()).unwrap();
    let mut stream = Box::pin(race.publications());

    let mut bytes = vec![0xFF, 0xFF];
    bytes.extend(checkpoint(4242));
    tx.send(Chunk::new(bytes[..3].to_vec(), at(0))).await.unwrap();
    tx.send(Chunk::new(bytes[3..9].to_vec(), at(0))).await.unwrap();
    tx.send(Chunk::new(bytes[9..].to_vec(), at(0))).await.unwrap();

    let mut corrupt = checkpoint(4242);
    corrupt[10] ^= 0x40;
    tx.send(Chunk::new(corrupt, at(15_000))).await.unwrap();
    tx.send(Chunk::new(checkpoint(4242), at(31_000))).await.unwrap();
    drop(tx);

    let board = last_update(&mut stream).await;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].racer.laps, 2);
    assert_eq!(board[0].racer.hits, 2);
    assert_eq!(board[0].racer.times, vec![31_000]);
}

#[tokio::test]
async fn frame_log_replay_reproduces_the_race() {
    let path = std::env::temp_dir().join(format!("lapgate-replay-{}.log", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let live_config = RaceConfig { frame_log: Some(path.clone()), ..RaceConfig::default() };
    let (tx, source) = ChannelSource::new(64);
    let live = Lapgate::attach(source, &live_config).unwrap();
    let mut stream = Box::pin(live.publications());

    run(&tx, &merged(laps(7, 0, 21_500, 4), laps(8, 250, 19_900, 4))).await;
    tx.send(Chunk::new(vec![0x01, 0x00, 0x7B], at(90_000))).await.unwrap();
    drop(tx);
    let live_board = last_update(&mut stream).await;
    drop(live);

    let logged = std::fs::read_to_string(&path).unwrap();
    assert_eq!(logged.lines().filter(|l| l.contains("Received chunk: ")).count(), 9);
    assert_eq!(logged.lines().filter(|l| l.contains("| CardID: ")).count(), 8);

    let replay_config = RaceConfig { replay_speed: 0.0, ..RaceConfig::default() };
    let replay = Lapgate::open(&path, &replay_config).await.unwrap();
    let mut stream = Box::pin(replay.publications());
    let replay_board = last_update(&mut stream).await;

    assert_eq!(replay_board, live_board);
    assert_eq!(replay_board[0].card_id, 8);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn reset_mid_race_starts_over() {
    let (tx, source) = ChannelSource::new(64);
    let race = Lapgate::attach(source, &RaceConfig::default()).unwrap();
    let mut stream = Box::pin(race.publications());

    run(&tx, &laps(3, 0, 20_000, 3)).await;
    for _ in 0..4 {
        stream.next().await;
    }
    assert_eq!(race.current_leaderboard()[0].racer.laps, 3);

    race.reset().await.unwrap();
    assert_eq!(stream.next().await, Some(Publication::update(Vec::new())));
    assert_eq!(stream.next().await, Some(Publication::finish(Vec::new())));

    run(&tx, &[(3, 100_000)]).await;
    match stream.next().await {
        Some(Publication::Update { racers }) => {
            assert_eq!(racers[0].racer.laps, 1);
            assert!(racers[0].racer.times.is_empty());
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fast_replay_loses_nothing_before_the_viewer_subscribes() {
    let path = std::env::temp_dir().join(format!("lapgate-fast-replay-{}.log", std::process::id()));
    let log: String = laps(21, 0, 20_000, 5)
        .iter()
        .map(|&(card_id, ms)| {
            let stamp = at(ms).to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            format!("[{stamp}] Received chunk: {}\n", hex::encode_upper(checkpoint(card_id)))
        })
        .collect();
    std::fs::write(&path, log).unwrap();

    let replay_config = RaceConfig { replay_speed: 0.0, ..RaceConfig::default() };
    for _ in 0..20 {
        let race = Lapgate::open(&path, &replay_config).await.unwrap();
        tokio::task::yield_now().await;

        let seen: Vec<Publication> =
            tokio::time::timeout(Duration::from_secs(5), race.publications().collect())
                .await
                .expect("replay stalled");
        assert_eq!(seen.iter().filter(|p| p.is_update()).count(), 5);
        assert!(matches!(seen.last(), Some(Publication::Finish { .. })));
    }
    let _ = std::fs::remove_file(&path);
}
