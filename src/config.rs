//! Configuration management for the intrigue protocol

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::game::resolution::ResolutionConfig;

/// Main configuration for the intrigue protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntrigueConfig {
    /// Session and termination rules
    pub game: GameConfig,
    /// Round resolution policy constants
    pub resolution: ResolutionConfig,
    /// Execution backend orchestration parameters
    pub backend: BackendConfig,
    /// Structured logging settings
    pub observability: ObservabilityConfig,
}

/// Who wins when final prestige is equal.
///
/// The historical default is player 1. It is a policy choice, kept as
/// explicit configuration rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    Player1,
    Player2,
}

/// Session-level game rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Rounds per match; the game ends no later than this.
    pub max_rounds: u32,
    pub starting_hit_points: u32,
    pub max_hit_points: u32,
    pub starting_mana: u32,
    pub max_mana: u32,
    pub starting_prestige: i64,
    pub max_prestige: i64,
    /// Winner on equal final prestige.
    pub tie_break: TieBreak,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            starting_hit_points: 100,
            max_hit_points: 100,
            starting_mana: 50,
            max_mana: 50,
            starting_prestige: 50,
            max_prestige: 200,
            tie_break: TieBreak::Player1,
        }
    }
}

/// Transaction orchestration parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Fixed delay between status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum status polls before an operation is classified
    /// `TimedOutPending`.
    pub max_poll_attempts: u32,
    /// Bounded retries for rejected simulations/submissions.
    pub retry_attempts: u32,
    /// Base backoff between retries, in milliseconds. Grows linearly with
    /// the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_poll_attempts: 20,
            retry_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

/// Structured logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default log level directive (trace, debug, info, warn, error);
    /// `RUST_LOG` still overrides it.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Write to stderr instead of stdout.
    pub log_to_stderr: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_to_stderr: false,
        }
    }
}

impl IntrigueConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path).map_err(|e| ProtocolError::Configuration {
            message: format!("Failed to read config file: {}", e),
            field: "config_file".to_string(),
        })?;

        let config: IntrigueConfig =
            toml::from_str(&content).map_err(|e| ProtocolError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                field: "config_format".to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ProtocolError> {
        let content = toml::to_string_pretty(self).map_err(|e| ProtocolError::Configuration {
            message: format!("Failed to serialize config: {}", e),
            field: "config_serialization".to_string(),
        })?;

        fs::write(path, content).map_err(|e| ProtocolError::Configuration {
            message: format!("Failed to write config file: {}", e),
            field: "config_write".to_string(),
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.game.max_rounds == 0 {
            return Err(ProtocolError::Configuration {
                message: "Max rounds must be at least 1".to_string(),
                field: "game.max_rounds".to_string(),
            });
        }

        if self.game.starting_hit_points == 0
            || self.game.starting_hit_points > self.game.max_hit_points
        {
            return Err(ProtocolError::Configuration {
                message: "Starting hit points must be in (0, max_hit_points]".to_string(),
                field: "game.starting_hit_points".to_string(),
            });
        }

        if self.game.starting_mana > self.game.max_mana {
            return Err(ProtocolError::Configuration {
                message: "Starting mana must not exceed max_mana".to_string(),
                field: "game.starting_mana".to_string(),
            });
        }

        if self.game.starting_prestige <= 0 || self.game.starting_prestige > self.game.max_prestige
        {
            return Err(ProtocolError::Configuration {
                message: "Starting prestige must be in (0, max_prestige]".to_string(),
                field: "game.starting_prestige".to_string(),
            });
        }

        if self.resolution.damage_min > self.resolution.damage_max {
            return Err(ProtocolError::Configuration {
                message: "Damage range is inverted".to_string(),
                field: "resolution.damage_min".to_string(),
            });
        }

        if self.resolution.draw_bonus < 0
            || self.resolution.failed_plot_penalty < 0
            || self.resolution.assassination_prestige < 0
            || self.resolution.rebellion_prestige < 0
            || self.resolution.bribery_prestige < 0
        {
            return Err(ProtocolError::Configuration {
                message: "Resolution magnitudes are stored positive".to_string(),
                field: "resolution".to_string(),
            });
        }

        if self.backend.max_poll_attempts == 0 {
            return Err(ProtocolError::Configuration {
                message: "Max poll attempts must be greater than 0".to_string(),
                field: "backend.max_poll_attempts".to_string(),
            });
        }

        if self.backend.poll_interval_ms == 0 {
            return Err(ProtocolError::Configuration {
                message: "Poll interval must be greater than 0".to_string(),
                field: "backend.poll_interval_ms".to_string(),
            });
        }

        if self.observability.level.parse::<tracing::Level>().is_err() {
            return Err(ProtocolError::Configuration {
                message: format!("Unknown log level: {}", self.observability.level),
                field: "observability.level".to_string(),
            });
        }

        Ok(())
    }

    /// Production defaults: patient polling, conservative retries.
    pub fn production() -> Self {
        Self {
            backend: BackendConfig {
                poll_interval_ms: 1000,
                max_poll_attempts: 30,
                retry_attempts: 2,
                retry_backoff_ms: 500,
            },
            ..Default::default()
        }
    }

    /// Development defaults: fast polls and short backoff so local test
    /// loops stay quick.
    pub fn development() -> Self {
        Self {
            backend: BackendConfig {
                poll_interval_ms: 10,
                max_poll_attempts: 5,
                retry_attempts: 3,
                retry_backoff_ms: 5,
            },
            ..Default::default()
        }
    }
}
