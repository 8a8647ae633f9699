//! Resolving the caller's subject identifier from their id token.
//!
//! Verifying the token is the identity service's job; this side only
//! forwards it and reads back the subject.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::regel::{AuthError, HttpConfig, TokenProvider};

pub const ID_TOKEN_HEADER: &str = "ID_token";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("id token rejected: {0}")]
    Unauthenticated(String),

    #[error("identity lookup failed{}: {message}", status_suffix(.status))]
    Lookup { status: Option<u16>, message: String },

    #[error("authentication against identity service failed: {0}")]
    Auth(#[from] AuthError),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (HTTP {status})"))
        .unwrap_or_default()
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the subject identifier the id token belongs to.
    async fn resolve(&self, id_token: &str) -> Result<String, IdentityError>;

    /// Returns the subject identifier for a national identity number.
    ///
    /// Used by trusted callers that have no end-user token.
    async fn resolve_person(&self, fnr: &str) -> Result<String, IdentityError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub subject_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersonLookup {
    pub fnr: String,
}

/// Resolves subjects through an HTTP lookup service.
pub struct HttpIdentityResolver {
    client: Client,
    url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpIdentityResolver {
    pub fn new(
        url: impl Into<String>,
        config: &HttpConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| IdentityError::Lookup {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: url.into(),
            tokens,
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, id_token: &str) -> Result<String, IdentityError> {
        let request = self.request().await?.header(ID_TOKEN_HEADER, id_token);
        Self::lookup(request).await
    }

    async fn resolve_person(&self, fnr: &str) -> Result<String, IdentityError> {
        let request = self.request().await?.json(&PersonLookup {
            fnr: fnr.to_string(),
        });
        Self::lookup(request).await
    }
}

impl HttpIdentityResolver {
    async fn request(&self) -> Result<RequestBuilder, IdentityError> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    async fn lookup(request: RequestBuilder) -> Result<String, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Lookup {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IdentityError::Unauthenticated(format!(
                "identity service answered HTTP {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Identity lookup failed");
            return Err(IdentityError::Lookup {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body: IdentityResponse = response.json().await.map_err(|e| IdentityError::Lookup {
            status: Some(status.as_u16()),
            message: format!("malformed identity response: {e}"),
        })?;

        if body.subject_id.is_empty() {
            return Err(IdentityError::Lookup {
                status: Some(status.as_u16()),
                message: "identity response had an empty subject".to_string(),
            });
        }

        debug!("Subject resolved");
        Ok(body.subject_id)
    }
}
