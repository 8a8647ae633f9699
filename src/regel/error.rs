use std::time::Duration;
use thiserror::Error;

use super::auth::AuthError;

#[derive(Debug, Error)]
pub enum RegelApiError {
    #[error("failed to start behov{}: {message}", status_suffix(.status))]
    JobStart { status: Option<u16>, message: String },

    #[error("failed to poll behov status: {message}")]
    Poll {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("polled behov status for more than {} ms", .0.as_millis())]
    PollTimeout(Duration),

    #[error("polling of behov status was cancelled")]
    Cancelled,

    #[error("failed to fetch subsumsjon{}: {message}", status_suffix(.status))]
    ResultFetch { status: Option<u16>, message: String },

    #[error("authentication against regel-api failed: {0}")]
    Auth(#[from] AuthError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl RegelApiError {
    /// Downstream HTTP status, when the failure carried one.
    pub fn downstream_status(&self) -> Option<u16> {
        match self {
            RegelApiError::JobStart { status, .. } | RegelApiError::ResultFetch { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    pub(crate) fn poll(message: impl Into<String>) -> Self {
        RegelApiError::Poll {
            message: message.into(),
            source: None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (HTTP {status})"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, RegelApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_downstream_status() {
        let err = RegelApiError::JobStart {
            status: Some(404),
            message: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "failed to start behov (HTTP 404): Not Found");
        assert_eq!(err.downstream_status(), Some(404));

        let err = RegelApiError::ResultFetch {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "failed to fetch subsumsjon: connection refused");
        assert_eq!(err.downstream_status(), None);
    }

    #[test]
    fn test_timeout_message() {
        let err = RegelApiError::PollTimeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "polled behov status for more than 20000 ms");
    }
}
