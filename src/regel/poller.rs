//! Polling a started job until the engine redirects to its result.
//!
//! The loop issues one [`StatusCheck`] at a time, sleeps a fixed interval
//! between checks, and gives up when the overall deadline passes. There is no
//! attempt cap and no backoff growth; the deadline is the only bound.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{RegelApiError, Result};
use super::http::{RegelApi, describe_failure, location_header};
use super::models::{BehovStatusResponse, JobStatus, PollLocation, ResultLocation};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// A single status check against a poll location.
#[async_trait]
pub trait StatusCheck: Send + Sync {
    async fn check(&self, location: &PollLocation) -> Result<JobStatus>;
}

/// [`StatusCheck`] over HTTP.
pub struct RegelApiStatusCheck {
    api: RegelApi,
}

impl RegelApiStatusCheck {
    pub fn new(api: RegelApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StatusCheck for RegelApiStatusCheck {
    async fn check(&self, location: &PollLocation) -> Result<JobStatus> {
        let response = self
            .api
            .get(location.as_str())
            .await?
            .send()
            .await
            .map_err(|e| RegelApiError::Poll {
                message: format!("status check of {location} failed"),
                source: Some(e),
            })?;

        let status = response.status();

        if status.is_redirection() {
            let result = location_header(response.headers()).ok_or_else(|| {
                RegelApiError::poll(format!(
                    "HTTP {} from {location} without Location header",
                    status.as_u16()
                ))
            })?;
            return Ok(JobStatus::Redirect(ResultLocation::from_header(result)));
        }

        if !status.is_success() {
            let message = describe_failure(response).await;
            return Err(RegelApiError::poll(format!(
                "HTTP {} from {location}: {message}",
                status.as_u16()
            )));
        }

        let body: BehovStatusResponse =
            response.json().await.map_err(|e| RegelApiError::Poll {
                message: format!("malformed status body from {location}"),
                source: Some(e),
            })?;
        debug!(%location, status = %body.status, "Behov still running");

        Ok(JobStatus::Pending)
    }
}

/// Drives a [`StatusCheck`] until redirect, timeout or cancellation.
#[derive(Clone)]
pub struct StatusPoller {
    check: Arc<dyn StatusCheck>,
    interval: Duration,
    timeout: Duration,
}

impl StatusPoller {
    pub fn new(check: Arc<dyn StatusCheck>) -> Self {
        Self {
            check,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Polls `location` until the job redirects to its result.
    ///
    /// Fails with [`RegelApiError::PollTimeout`] once the deadline passes,
    /// and with [`RegelApiError::Cancelled`] as soon as `cancel` fires, even
    /// in the middle of a check or a delay.
    pub async fn poll(
        &self,
        location: &PollLocation,
        cancel: &CancellationToken,
    ) -> Result<ResultLocation> {
        if self.timeout.is_zero() {
            warn!(%location, "Poll deadline is zero, not polling");
            return Err(RegelApiError::PollTimeout(self.timeout));
        }

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.poll_until_redirect(location, cancel)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    %location,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Behov did not complete before the deadline"
                );
                Err(RegelApiError::PollTimeout(self.timeout))
            }
        }
    }

    async fn poll_until_redirect(
        &self,
        location: &PollLocation,
        cancel: &CancellationToken,
    ) -> Result<ResultLocation> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(location, attempts)),
                status = self.check.check(location) => status?,
            };

            match status {
                JobStatus::Redirect(result) => {
                    info!(%location, %result, attempts, "Behov completed");
                    return Ok(result);
                }
                JobStatus::Pending => {
                    debug!(%location, attempts, "Behov pending");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(location, attempts)),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    fn cancelled(&self, location: &PollLocation, attempts: u32) -> RegelApiError {
        info!(%location, attempts, "Polling cancelled");
        RegelApiError::Cancelled
    }
}
