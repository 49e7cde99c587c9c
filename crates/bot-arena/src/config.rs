//! Configuration file loading for the bot arena.
//!
//! This module provides types and functions for loading arena configuration
//! from `arena.toml`. Every section is optional; missing values fall back to
//! the defaults documented on each field.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cadence::{ArenaSettings, Schedule};
use crate::elo::{DEFAULT_RATING, K_FACTOR};
use crate::matchmaking::DEFAULT_SIGMA;
use crate::openings::{OpeningBook, DEFAULT_OPENING_PLIES};

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A time of day is not in `HH:MM` format.
    #[error("Invalid time for {field}: {value:?} (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },
}

/// When the daily phases run, in local time.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time of day the compute phase starts. Defaults to "03:00".
    pub compute_at: String,
    /// Time of day results are announced. Defaults to "12:00".
    pub announce_at: String,
    /// Seconds between scheduler checks. Defaults to 30.
    pub poll_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            compute_at: "03:00".to_string(),
            announce_at: "12:00".to_string(),
            poll_interval_secs: 30,
        }
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

impl ScheduleConfig {
    /// Parses the configured times.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTime`] if a time is not `HH:MM`.
    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        Ok(Schedule {
            compute_at: parse_time("schedule.compute_at", &self.compute_at)?,
            announce_at: parse_time("schedule.announce_at", &self.announce_at)?,
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
        })
    }
}

/// Elo parameters shared by both rating tracks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RatingConfig {
    /// Defaults to 30.
    pub k_factor: f64,
    /// Rating of a bot that has never played. Defaults to 800.
    pub initial: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: K_FACTOR,
            initial: DEFAULT_RATING,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Width of the Gaussian rating preference. Defaults to 128.
    pub sigma: f64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
        }
    }
}

/// Opening seeding.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OpeningsConfig {
    /// Plies played from the book before bots take over. Defaults to 4.
    pub plies: usize,
    /// Custom lines in UCI. Uses the built-in book when absent.
    pub lines: Option<Vec<Vec<String>>>,
}

impl Default for OpeningsConfig {
    fn default() -> Self {
        Self {
            plies: DEFAULT_OPENING_PLIES,
            lines: None,
        }
    }
}

impl OpeningsConfig {
    pub fn book(&self) -> OpeningBook {
        match &self.lines {
            Some(lines) => OpeningBook::from_lines(lines.clone()),
            None => OpeningBook::builtin(),
        }
    }
}

/// Puzzle source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PuzzlesConfig {
    /// Directory of dated puzzle files. Puzzles are disabled when absent.
    pub dir: Option<PathBuf>,
    /// Bulk puzzles per day besides the daily one. Defaults to 5.
    pub bulk: usize,
}

impl Default for PuzzlesConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("data/puzzles")),
            bulk: 5,
        }
    }
}

/// Configuration for one bot.
///
/// `strategy` names an entry of the worker's strategy registry; the other
/// fields are display metadata and strategy parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Registry name of the strategy, e.g. "minimax".
    pub strategy: String,
    #[serde(default)]
    pub creator: String,
    /// Accent color, e.g. "#3b82f6".
    #[serde(default)]
    pub color: String,
    /// Search depth for searching strategies.
    #[serde(default)]
    pub depth: Option<u32>,
    /// Fixed seed for randomized strategies.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Main arena configuration structure, read from `arena.toml`.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ArenaConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub openings: OpeningsConfig,
    #[serde(default)]
    pub puzzles: PuzzlesConfig,
    /// Map of bot ids to their configurations.
    #[serde(default)]
    pub bots: BTreeMap<String, BotConfig>,
}

impl ArenaConfig {
    /// Loads the configuration from a file, or the defaults if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Tournament parameters for the cadence controller.
    pub fn settings(&self) -> ArenaSettings {
        ArenaSettings {
            k_factor: self.rating.k_factor,
            initial_rating: self.rating.initial,
            sigma: self.matchmaking.sigma,
            opening_plies: self.openings.plies,
            openings: self.openings.book(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_toml_config() {
        let toml_content = r##"
[schedule]
compute_at = "02:30"
announce_at = "18:00"
poll_interval_secs = 10

[rating]
k_factor = 16.0

[matchmaking]
sigma = 200.0

[openings]
plies = 2
lines = [["e2e4", "e7e5"], ["d2d4", "d7d5"]]

[puzzles]
dir = "/srv/puzzles"
bulk = 3

[bots.minimax]
strategy = "minimax"
creator = "arena"
color = "#3b82f6"
depth = 3

[bots.random]
strategy = "random"
seed = 42
"##;

        let config: ArenaConfig = toml::from_str(toml_content).unwrap();

        let schedule = config.schedule.schedule().unwrap();
        assert_eq!(schedule.compute_at, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(schedule.announce_at, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(schedule.poll_interval, Duration::from_secs(10));

        assert_eq!(config.rating.k_factor, 16.0);
        assert_eq!(config.rating.initial, 800.0); // default
        assert_eq!(config.matchmaking.sigma, 200.0);
        assert_eq!(config.openings.book().lines().len(), 2);
        assert_eq!(config.puzzles.dir, Some(PathBuf::from("/srv/puzzles")));
        assert_eq!(config.puzzles.bulk, 3);

        assert_eq!(config.bots.len(), 2);
        let minimax = &config.bots["minimax"];
        assert_eq!(minimax.strategy, "minimax");
        assert_eq!(minimax.creator, "arena");
        assert_eq!(minimax.color, "#3b82f6");
        assert_eq!(minimax.depth, Some(3));

        let random = &config.bots["random"];
        assert_eq!(random.seed, Some(42));
        assert!(random.creator.is_empty());
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: ArenaConfig = toml::from_str("").unwrap();

        assert!(config.bots.is_empty());
        assert_eq!(config.rating.k_factor, 30.0);
        assert_eq!(config.rating.initial, 800.0);
        assert_eq!(config.matchmaking.sigma, 128.0);
        assert_eq!(config.openings.plies, 4);
        assert_eq!(config.openings.book(), OpeningBook::builtin());
        assert_eq!(config.puzzles.bulk, 5);

        let schedule = config.schedule.schedule().unwrap();
        assert_eq!(schedule.compute_at, NaiveTime::from_hms_opt(3, 0, 0).unwrap());
        assert_eq!(schedule.announce_at, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_time_is_rejected() {
        let config: ArenaConfig = toml::from_str("[schedule]\ncompute_at = \"25:99\"").unwrap();

        let result = config.schedule.schedule();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidTime { field: "schedule.compute_at", .. })
        ));
    }

    #[test]
    fn test_bot_without_strategy_is_parse_error() {
        let result: Result<ArenaConfig, _> = toml::from_str("[bots.x]\ncreator = \"me\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArenaConfig::from_path(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, ArenaConfig::default());
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "[matchmaking]\nsigma = 64.0\n").unwrap();

        let config = ArenaConfig::from_path(&path).unwrap();

        assert_eq!(config.matchmaking.sigma, 64.0);
    }

    #[test]
    fn test_from_path_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "[bots.x\nstrategy = ").unwrap();

        assert!(matches!(
            ArenaConfig::from_path(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_settings_carry_config_values() {
        let config: ArenaConfig =
            toml::from_str("[rating]\nk_factor = 20.0\ninitial = 1000.0\n[openings]\nplies = 0")
                .unwrap();

        let settings = config.settings();

        assert_eq!(settings.k_factor, 20.0);
        assert_eq!(settings.initial_rating, 1000.0);
        assert_eq!(settings.opening_plies, 0);
    }

    #[test]
    fn test_bot_config_serialization_roundtrip() {
        let bot = BotConfig {
            strategy: "digits".to_string(),
            creator: "me".to_string(),
            color: "#000000".to_string(),
            depth: None,
            seed: Some(7),
        };

        let serialized = toml::to_string(&bot).unwrap();
        let deserialized: BotConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized, bot);
    }
}
