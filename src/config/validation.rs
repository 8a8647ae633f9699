use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is not configured")]
    MissingUrl { field: &'static str },

    #[error("{field} must be an http(s) URL, got '{value}'")]
    InvalidUrlScheme { field: &'static str, value: String },

    #[error("regel_api.poll_interval must be positive")]
    ZeroPollInterval,

    #[error("regel_api.poll_interval ({interval}) exceeds regel_api.poll_timeout ({timeout})")]
    PollIntervalExceedsTimeout { interval: String, timeout: String },

    #[error("server.base_path must start with '/', got '{0}'")]
    InvalidBasePath(String),

    #[error("server.id_token_cookie must not be empty")]
    EmptyCookieName,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_url("regel_api.base_url", &config.regel_api.base_url)?;
    validate_url("identity.url", &config.identity.url)?;
    validate_polling(config)?;
    validate_server(config)?;
    Ok(())
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingUrl { field });
    }

    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ValidationError::InvalidUrlScheme {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

/// A zero timeout is allowed and means "never wait"; a zero interval would
/// turn the poll loop into a busy loop.
fn validate_polling(config: &Config) -> Result<(), ValidationError> {
    let interval = config.regel_api.poll_interval;
    let timeout = config.regel_api.poll_timeout;

    if interval.as_duration().is_zero() {
        return Err(ValidationError::ZeroPollInterval);
    }

    if !timeout.as_duration().is_zero() && interval > timeout {
        return Err(ValidationError::PollIntervalExceedsTimeout {
            interval: interval.to_string(),
            timeout: timeout.to_string(),
        });
    }

    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if !config.server.base_path.is_empty() && !config.server.base_path.starts_with('/') {
        return Err(ValidationError::InvalidBasePath(
            config.server.base_path.clone(),
        ));
    }

    if config.server.id_token_cookie.trim().is_empty() {
        return Err(ValidationError::EmptyCookieName);
    }

    Ok(())
}
