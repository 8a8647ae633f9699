use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "KALKULATOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/kalkulator.toml";
const ENV_PREFIX: &str = "KALKULATOR";
const ENV_SEPARATOR: &str = "__";

/// Path of the configuration file: `KALKULATOR_CONFIG` or the default.
pub fn config_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(config_path: &Path) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config);

    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    apply_secrets(config, |name| env::var(name).ok());
}

fn apply_secrets(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let secret = |name: &str| lookup(name).filter(|value| !value.is_empty());

    if let Some(token) = secret("REGEL_API_TOKEN") {
        config.regel_api.token = Some(token);
    }
    if let Some(api_key) = secret("REGEL_API_KEY") {
        config.regel_api.api_key = Some(api_key);
    }
    if let Some(token) = secret("IDENTITY_TOKEN") {
        config.identity.token = Some(token);
    }
    if let Some(key) = secret("FORSKUDD_API_KEY") {
        config.server.recalculation_api_key = Some(key);
    }

    // The identity service sits behind the same gateway in most deployments
    if config.identity.token.is_none() {
        config.identity.token = config.regel_api.token.clone();
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: &Path) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // KALKULATOR__REGEL_API__BASE_URL -> regel_api.base_url
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
