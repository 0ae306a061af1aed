//! Directory configuration.
//!
//! Loaded from TOML, then overridden from `PLAYERBRIDGE_*` environment
//! variables, then validated. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.
//!
//! ```toml
//! database_name = "cloudnet_cloud_players"
//! channel = "bridge_player_api_channel"
//! messenger_capacity = 1024
//!
//! [logging]
//! level = "info"
//! json_format = false
//! ```

use std::path::Path;

use playerbridge_protocol::PLAYER_API_CHANNEL;
use serde::{Deserialize, Serialize};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "PLAYERBRIDGE_";

/// Errors raised while loading or validating a [`DirectoryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override couldn't be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },

    /// A field holds a value the directory can't run with.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The global tracing subscriber couldn't be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Settings for one directory node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Name of the offline player collection.
    pub database_name: String,

    /// Channel commands are published and received on.
    pub channel: String,

    /// Queue capacity per subscriber of an in-process messenger.
    pub messenger_capacity: usize,

    pub logging: LoggingConfig,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `"info"`,
    /// `"playerbridge=debug"`).
    pub level: String,

    /// Emit one JSON object per event instead of human-readable lines.
    pub json_format: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            database_name: "cloudnet_cloud_players".to_string(),
            channel: PLAYER_API_CHANNEL.to_string(),
            messenger_capacity: 1024,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl DirectoryConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `path`, applies environment overrides and validates.
    ///
    /// A missing file is not an error: defaults plus overrides are used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::info!(
                path = %path.display(),
                "config file not found, using defaults"
            );
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PLAYERBRIDGE_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a full variable name
    /// (e.g. `PLAYERBRIDGE_CHANNEL`) to its value.
    ///
    /// Recognised variables: `DATABASE_NAME`, `CHANNEL`,
    /// `MESSENGER_CAPACITY`, `LOG_LEVEL`, `LOG_JSON`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("DATABASE_NAME") {
            self.database_name = value;
        }
        if let Some((_, value)) = var("CHANNEL") {
            self.channel = value;
        }
        if let Some((key, value)) = var("MESSENGER_CAPACITY") {
            self.messenger_capacity = value
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key, value })?;
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some((key, value)) = var("LOG_JSON") {
            let json_format = match value.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            };
            self.logging.json_format =
                json_format.ok_or(ConfigError::InvalidOverride { key, value })?;
        }
        Ok(())
    }

    /// Checks the configuration for values the directory can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database_name must not be empty".into(),
            ));
        }
        if self.channel.trim().is_empty() {
            return Err(ConfigError::Invalid("channel must not be empty".into()));
        }
        if self.messenger_capacity == 0 {
            return Err(ConfigError::Invalid(
                "messenger_capacity must be at least 1".into(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.level must not be empty".into(),
            ));
        }
        Ok(())
    }
}
