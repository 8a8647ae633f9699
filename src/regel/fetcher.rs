use async_trait::async_trait;
use tracing::{debug, warn};

use super::error::{RegelApiError, Result};
use super::http::{RegelApi, describe_failure};
use super::models::{CalculationResult, ResultLocation};

/// Retrieves the stored result of a completed job. Single attempt.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    async fn fetch(&self, location: &ResultLocation) -> Result<CalculationResult>;
}

pub struct RegelApiResultFetcher {
    api: RegelApi,
}

impl RegelApiResultFetcher {
    pub fn new(api: RegelApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ResultFetcher for RegelApiResultFetcher {
    async fn fetch(&self, location: &ResultLocation) -> Result<CalculationResult> {
        let response = self
            .api
            .get(location.as_str())
            .await?
            .send()
            .await
            .map_err(|e| RegelApiError::ResultFetch {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = describe_failure(response).await;
            warn!(%location, status = status.as_u16(), %message, "Fetching subsumsjon failed");
            return Err(RegelApiError::ResultFetch {
                status: Some(status.as_u16()),
                message,
            });
        }

        let result: CalculationResult =
            response
                .json()
                .await
                .map_err(|e| RegelApiError::ResultFetch {
                    status: Some(status.as_u16()),
                    message: format!("malformed subsumsjon: {e}"),
                })?;

        debug!(%location, behov_id = ?result.behov_id, "Subsumsjon fetched");
        Ok(result)
    }
}
