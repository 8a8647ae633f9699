//! Shared HTTP plumbing for the rules-engine clients

use reqwest::header::{AUTHORIZATION, HeaderMap, LOCATION};
use reqwest::{Client, RequestBuilder, Response, redirect};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::auth::TokenProvider;
use super::error::{RegelApiError, Result};

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("kalkulator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Authenticated access to one rules-engine deployment.
///
/// Cheap to clone; all clones share the connection pool. Redirects are never
/// followed, since a 303 from the status resource is the completion signal.
#[derive(Clone)]
pub struct RegelApi {
    client: Client,
    base_url: Arc<str>,
    tokens: Arc<dyn TokenProvider>,
    api_key: Option<Arc<str>>,
}

impl RegelApi {
    pub fn new(
        base_url: &str,
        config: &HttpConfig,
        tokens: Arc<dyn TokenProvider>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| RegelApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            tokens,
            api_key: api_key.filter(|key| !key.is_empty()).map(Arc::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a location returned by the engine onto the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub(crate) async fn get(&self, path: &str) -> Result<RequestBuilder> {
        self.authorize(self.client.get(self.url(path))).await
    }

    pub(crate) async fn post(&self, path: &str) -> Result<RequestBuilder> {
        self.authorize(self.client.post(self.url(path))).await
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        let mut request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_ref());
        }
        Ok(request)
    }
}

impl fmt::Debug for RegelApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegelApi")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub(crate) fn location_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Reads a short description of a failed response for error messages.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("Unknown");
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => {
            format!("{reason}: {}", truncate(body.trim(), 512))
        }
        _ => reason.to_string(),
    }
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
