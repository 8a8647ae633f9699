use crate::calculator::BasisPolicy;
use crate::humanize::HumanDuration;
use crate::regel::HttpConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub regel_api: RegelApiConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub calculation: CalculationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Prefix for the calculation routes
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Cookie carrying the end user's id token
    #[serde(default = "default_id_token_cookie")]
    pub id_token_cookie: String,
    /// Key trusted callers send in `x-api-key` to `POST {base_path}/behov/reberegning`
    /// (loaded from environment, not from config file)
    #[serde(skip)]
    pub recalculation_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_path: default_base_path(),
            id_token_cookie: default_id_token_cookie(),
            recalculation_api_key: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8099))
}

fn default_base_path() -> String {
    "/arbeid/dagpenger/kalkulator-api".to_string()
}

fn default_id_token_cookie() -> String {
    "selvbetjening-idtoken".to_string()
}

/// Rules engine (regel-api) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegelApiConfig {
    #[serde(default)]
    pub base_url: String,
    /// Delay between two status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval: HumanDuration,
    /// Deadline for the whole poll phase
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
    /// Shared-secret API key (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for RegelApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            poll_interval: default_poll_interval(),
            poll_timeout: default_poll_timeout(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            token: None,
            api_key: None,
        }
    }
}

impl RegelApiConfig {
    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: self.connect_timeout.as_duration(),
            request_timeout: self.request_timeout.as_duration(),
            ..HttpConfig::default()
        }
    }
}

fn default_poll_interval() -> HumanDuration {
    HumanDuration::from_millis(100)
}

fn default_poll_timeout() -> HumanDuration {
    HumanDuration::from_secs(20)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

/// Identity lookup configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub url: String,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

/// Calculation policy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CalculationConfig {
    /// Whether `grunnlagResultat` must be present in a result
    #[serde(default)]
    pub basis: BasisPolicy,
}
