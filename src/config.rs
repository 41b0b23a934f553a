//! Race configuration
//!
//! Settings are read from YAML. Every key is optional:
//!
//! ```yaml
//! pass_gap_ms: 10000     # debounce window between accepted crossings
//! lap_target: 5          # laps to finish
//! initial_mode: 1        # 1 most laps, 2 lowest total time, 3 fastest lap
//! frame_log: frames.log  # append-only diagnostic log, omit to disable
//! publication_capacity: 256
//! replay_speed: 1.0      # capture replay pacing, 0 replays without delays
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::types::RaceMode;
use crate::{Result, TimingError};

/// Adjustable race settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceConfig {
    /// Minimum milliseconds between two accepted crossings of the same card
    pub pass_gap_ms: u64,
    /// Crossings needed to finish
    pub lap_target: u32,
    /// Ranking rule at startup
    pub initial_mode: RaceMode,
    /// Diagnostic frame log, appended to if it exists
    pub frame_log: Option<PathBuf>,
    /// Publications buffered per viewer before slow viewers start lagging
    pub publication_capacity: usize,
    /// Playback speed for capture replays
    pub replay_speed: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            pass_gap_ms: 10_000,
            lap_target: 5,
            initial_mode: RaceMode::MostLaps,
            frame_log: None,
            publication_capacity: 256,
            replay_speed: 1.0,
        }
    }
}

impl RaceConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RaceConfig = if yaml.trim().is_empty() {
            RaceConfig::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), ?config, "loaded race configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lap_target == 0 {
            return Err(TimingError::config_error("lap_target must be at least 1"));
        }
        if self.publication_capacity == 0 {
            return Err(TimingError::config_error("publication_capacity must be at least 1"));
        }
        if !self.replay_speed.is_finite() || self.replay_speed < 0.0 {
            return Err(TimingError::config_error(format!(
                "replay_speed must be zero or positive, got {}",
                self.replay_speed
            )));
        }
        Ok(())
    }

    pub fn pass_gap(&self) -> Duration {
        Duration::from_millis(self.pass_gap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reader_setup() {
        let config = RaceConfig::default();
        assert_eq!(config.pass_gap(), Duration::from_secs(10));
        assert_eq!(config.lap_target, 5);
        assert_eq!(config.initial_mode, RaceMode::MostLaps);
        assert!(config.frame_log.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = RaceConfig::from_yaml_str("lap_target: 10\ninitial_mode: 3\n").unwrap();
        assert_eq!(config.lap_target, 10);
        assert_eq!(config.initial_mode, RaceMode::FastestLap);
        assert_eq!(config.pass_gap_ms, 10_000);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(RaceConfig::from_yaml_str("").unwrap(), RaceConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            RaceConfig::from_yaml_str("lap_target: 0"),
            Err(TimingError::Config { .. })
        ));
        assert!(matches!(
            RaceConfig::from_yaml_str("initial_mode: 4"),
            Err(TimingError::Parse { .. })
        ));
        assert!(matches!(
            RaceConfig::from_yaml_str("replay_speed: -1.0"),
            Err(TimingError::Config { .. })
        ));
        assert!(matches!(
            RaceConfig::from_yaml_str("hit_timeout: 200"),
            Err(TimingError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let err = RaceConfig::load("/nonexistent/lapgate.yaml").await.unwrap_err();
        match err {
            TimingError::File { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/lapgate.yaml")),
            other => panic!("expected file error, got {other:?}"),
        }
    }
}
