//! Configuration management for the kalkulator service
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use kalkulator::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `KALKULATOR__<section>__<key>`
//!
//! Examples:
//! - `KALKULATOR__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `KALKULATOR__REGEL_API__BASE_URL=https://dp-proxy/proxy/v1/regelapi`
//! - `KALKULATOR__REGEL_API__POLL_TIMEOUT=30s`
//!
//! Secrets are only read from `REGEL_API_TOKEN`, `REGEL_API_KEY`,
//! `IDENTITY_TOKEN` and `FORSKUDD_API_KEY`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/kalkulator.toml`.
//! This can be overridden using the `KALKULATOR_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::calculator::BasisPolicy;
pub use crate::humanize::HumanDuration;
pub use models::{CalculationConfig, Config, IdentityConfig, RegelApiConfig, ServerConfig};
pub use validation::ValidationError;

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
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(sources::config_path())
    }

    /// Load configuration from a specific file, still honouring
    /// environment overrides and secrets.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load(&path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
