//! Configuration loading for sync-client.
//!
//! A session is configured from a TOML file (or built in code with
//! [`SessionConfig::new`]).

use boardsync_core::Preferences;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for one game session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Panic on defects instead of only logging them (default: debug builds).
    #[serde(default = "default_strict_defects")]
    pub strict_defects: bool,
    /// Connection configuration.
    pub connection: ConnectionConfig,
    /// Timer configuration.
    #[serde(default)]
    pub timers: TimerConfig,
    /// Account preferences.
    #[serde(default)]
    pub preferences: Preferences,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Socket path of the game, e.g. `/play/abcdefgh/v6`.
    pub address: String,
    /// How long to wait for the first snapshot in seconds (default: 10).
    #[serde(default = "default_snapshot_timeout_secs")]
    pub snapshot_timeout_secs: u64,
}

/// Timer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    /// Resync when a transmitted move is not echoed within this many
    /// milliseconds (default: 10000).
    #[serde(default = "default_move_ack_timeout_ms")]
    pub move_ack_timeout_ms: u64,
    /// Abandonment countdown tick in milliseconds (default: 1000).
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
    /// Delay before the game-end chime in milliseconds (default: 500).
    #[serde(default = "default_game_end_chime_delay_ms")]
    pub game_end_chime_delay_ms: u64,
}

// Default value functions

fn default_strict_defects() -> bool {
    cfg!(debug_assertions)
}

fn default_snapshot_timeout_secs() -> u64 {
    10
}

fn default_move_ack_timeout_ms() -> u64 {
    10_000
}

fn default_countdown_tick_ms() -> u64 {
    1_000
}

fn default_game_end_chime_delay_ms() -> u64 {
    500
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            move_ack_timeout_ms: default_move_ack_timeout_ms(),
            countdown_tick_ms: default_countdown_tick_ms(),
            game_end_chime_delay_ms: default_game_end_chime_delay_ms(),
        }
    }
}

impl TimerConfig {
    /// Move watchdog delay.
    pub fn move_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.move_ack_timeout_ms)
    }

    /// Countdown tick period.
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    /// Game-end chime delay.
    pub fn game_end_chime_delay(&self) -> Duration {
        Duration::from_millis(self.game_end_chime_delay_ms)
    }
}

impl ConnectionConfig {
    /// Snapshot wait as a duration.
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }
}

impl SessionConfig {
    /// Configuration with defaults for the game socket at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            strict_defects: default_strict_defects(),
            connection: ConnectionConfig {
                address: address.into(),
                snapshot_timeout_secs: default_snapshot_timeout_secs(),
            },
            timers: TimerConfig::default(),
            preferences: Preferences::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
