use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::{error, info, warn};

use super::models::Problem;
use crate::calculator::CalculationError;
use crate::identity::IdentityError;
use crate::regel::RegelApiError;

/// nginx's "client closed request"
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in: {0}")]
    Unauthorized(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Identity(IdentityError::Unauthenticated(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Identity(_) => StatusCode::BAD_GATEWAY,
            ApiError::Calculation(CalculationError::IncompleteResult { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Calculation(CalculationError::RegelApi(err)) => match err {
                RegelApiError::PollTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                RegelApiError::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
                RegelApiError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
                RegelApiError::JobStart { .. }
                | RegelApiError::Poll { .. }
                | RegelApiError::ResultFetch { .. }
                | RegelApiError::Auth(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) | ApiError::Identity(IdentityError::Unauthenticated(_)) => {
                "unauthorized"
            }
            ApiError::BadRequest(_) => "parameter",
            ApiError::Identity(_) => "identity",
            ApiError::Calculation(CalculationError::IncompleteResult { .. }) => {
                "incomplete-result"
            }
            ApiError::Calculation(CalculationError::RegelApi(err)) => match err {
                RegelApiError::JobStart { .. } => "job-start",
                RegelApiError::Poll { .. } => "poll",
                RegelApiError::PollTimeout(_) => "poll-timeout",
                RegelApiError::Cancelled => "cancelled",
                RegelApiError::ResultFetch { .. } => "result-fetch",
                RegelApiError::Auth(_) => "upstream-auth",
                RegelApiError::Client(_) => "internal",
            },
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn title(&self) -> &'static str {
        match self.code() {
            "unauthorized" => "Ikke innlogget",
            "parameter" => "Parameteret er ikke gyldig",
            "identity" => "Feil ved oppslag av person",
            "incomplete-result" => "Feil fra API, fikk ikke beregnet inntekt",
            "poll-timeout" => "Tidsavbrudd mot regel-api",
            "cancelled" => "Forespørselen ble avbrutt",
            "internal" => "Uhåndtert feil",
            _ => "Feil fra regel-api",
        }
    }

    fn log(&self) {
        let status = self.status_code();
        match self {
            ApiError::Calculation(CalculationError::RegelApi(RegelApiError::Cancelled)) => {
                info!(code = self.code(), "Calculation abandoned by client")
            }
            ApiError::Unauthorized(_) | ApiError::Identity(IdentityError::Unauthenticated(_)) => {
                info!(code = self.code(), error = %self, "Rejected unauthenticated request")
            }
            ApiError::BadRequest(_) => {
                info!(code = self.code(), error = %self, "Rejected invalid request")
            }
            _ if status.is_server_error() => {
                warn!(code = self.code(), status = status.as_u16(), error = %self, "Request failed")
            }
            _ => error!(code = self.code(), error = %self, "Unexpected error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = Problem {
            kind: format!("urn:dp:error:{}", self.code()),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
