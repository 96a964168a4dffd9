//! Configuration management for SpoolBox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use spoolbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Store at: {}", config.store.fjall_path.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `SPOOLBOX__<section>__<key>`:
//! - `SPOOLBOX__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `SPOOLBOX__STORE__FJALL_PATH=/var/lib/spoolbox`
//! - `SPOOLBOX__REPORT__UTC_OFFSET_MINUTES=-240`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/spoolbox.toml`.
//! This can be overridden using the `SPOOLBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{ApiLimits, Config, ReportConfig, ServerConfig, StoreConfig, TelemetryConfig};
pub use sources::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path (environment still applies)
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// `load_from_path` when a path is given, `load` otherwise
    pub fn load_or_default_path(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }
}
