//! Tracing subscriber setup for binaries that embed the directory.
//!
//! Library code only emits `tracing` events. Installing a subscriber is
//! left to the process, which calls [`init_logging`] once at startup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{ConfigError, LoggingConfig};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. With
/// `config.json_format` every event is written as one JSON object per
/// line, which suits log aggregation.
///
/// # Errors
/// [`ConfigError::Logging`] if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_format {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

fn build_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| ConfigError::Logging(e.to_string())),
    }
}
