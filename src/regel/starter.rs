//! Starting calculation jobs

use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{RegelApiError, Result};
use super::http::{RegelApi, describe_failure, location_header};
use super::models::{Context, JobRequest, PollLocation, RegelKontekst};
use crate::observability::Metrics;

/// Submits a behov to the rules engine.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Starts a calculation for `subject` and returns where to poll for it.
    async fn start(&self, subject: &str, context: &Context) -> Result<PollLocation>;
}

pub struct RegelApiJobClient {
    api: RegelApi,
    metrics: Arc<Metrics>,
}

impl RegelApiJobClient {
    pub fn new(api: RegelApi, metrics: Arc<Metrics>) -> Self {
        Self { api, metrics }
    }

    fn job_request(subject: &str, context: &Context) -> JobRequest {
        JobRequest::builder()
            .aktor_id(subject)
            .beregningsdato(Local::now().date_naive())
            .regelkontekst(RegelKontekst::from(context))
            .build()
    }
}

#[async_trait]
impl JobClient for RegelApiJobClient {
    async fn start(&self, subject: &str, context: &Context) -> Result<PollLocation> {
        self.metrics.context_used(context.label());

        let request = Self::job_request(subject, context);
        let response = self
            .api
            .post("/behov")
            .await?
            .json(&request)
            .send()
            .await
            .map_err(|e| RegelApiError::JobStart {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = describe_failure(response).await;
            warn!(status = status.as_u16(), %message, "regel-api rejected behov");
            return Err(RegelApiError::JobStart {
                status: Some(status.as_u16()),
                message,
            });
        }

        let location = location_header(response.headers()).ok_or_else(|| {
            RegelApiError::JobStart {
                status: Some(status.as_u16()),
                message: "response did not include a Location header".to_string(),
            }
        })?;

        let location = PollLocation::from_header(location);
        info!(%location, kontekst = %context, "Behov started");
        Ok(location)
    }
}
