//! Lapgate command line front end
//!
//! Prints every publication as one JSON line on stdout. When stdin is not the
//! byte source, JSON command lines read from stdin are forwarded to the race.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lapgate::providers::ReaderSource;
use lapgate::{CoalesceExt, Command, Lapgate, RaceConfig, RaceMode};

/// RFID lap timing
#[derive(Parser, Debug)]
#[command(name = "lapgate")]
#[command(about = "RFID transponder lap timing with live leaderboards", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a recorded frame log instead of reading live bytes
    #[arg(long, conflicts_with = "device")]
    replay: Option<PathBuf>,

    /// Device node to read (already configured for the reader). Defaults to stdin.
    #[arg(long)]
    device: Option<PathBuf>,

    /// Append raw chunks and frames to this diagnostic log
    #[arg(long)]
    frame_log: Option<PathBuf>,

    /// Minimum milliseconds between two counted crossings of one card
    #[arg(long)]
    pass_gap_ms: Option<u64>,

    /// Laps to finish
    #[arg(long)]
    lap_target: Option<u32>,

    /// Race mode: 1 most laps, 2 lowest total time, 3 fastest lap
    #[arg(long)]
    mode: Option<i64>,

    /// Replay speed multiplier, 0 for no delays
    #[arg(long)]
    replay_speed: Option<f64>,

    /// Print at most one leaderboard update per interval (milliseconds)
    #[arg(long)]
    coalesce_ms: Option<u64>,
}

impl Args {
    async fn race_config(&self) -> Result<RaceConfig> {
        let mut config = match &self.config {
            Some(path) => RaceConfig::load(path)
                .await
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => RaceConfig::default(),
        };

        if let Some(path) = &self.frame_log {
            config.frame_log = Some(path.clone());
        }
        if let Some(pass_gap_ms) = self.pass_gap_ms {
            config.pass_gap_ms = pass_gap_ms;
        }
        if let Some(lap_target) = self.lap_target {
            config.lap_target = lap_target;
        }
        if let Some(mode) = self.mode {
            config.initial_mode = RaceMode::try_from(mode).context("invalid --mode")?;
        }
        if let Some(speed) = self.replay_speed {
            config.replay_speed = speed;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.race_config().await?;

    let (race, commands_on_stdin) = match (&args.replay, &args.device) {
        (Some(log), _) => {
            let race = Lapgate::open(log, &config)
                .await
                .with_context(|| format!("opening frame log {}", log.display()))?;
            (race, true)
        }
        (None, Some(device)) => {
            let race = Lapgate::read_from(device, &config)
                .await
                .with_context(|| format!("opening device {}", device.display()))?;
            (race, true)
        }
        (None, None) => (Lapgate::attach(ReaderSource::stdin(), &config)?, false),
    };

    let publications = race.publications();
    if commands_on_stdin {
        tokio::spawn(forward_commands(race.commands()));
    }

    let mut publications = match args.coalesce_ms {
        Some(ms) => publications.coalesce_updates(Duration::from_millis(ms)).boxed(),
        None => publications.boxed(),
    };

    while let Some(publication) = publications.next().await {
        println!("{}", publication.to_json()?);
    }

    info!("Race source {} finished", race.source());
    Ok(())
}

/// Forward JSON command lines from stdin until it closes.
async fn forward_commands(commands: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match Command::from_json(&line) {
            Ok(command) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Ignoring command line: {}", e),
        }
    }
}
