use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::any::Any;
use tokio_util::sync::CancellationToken;

use super::{
    error::ApiError,
    models::{BehovQuery, RecalculationRequest},
    state::AppState,
    utils::cookie_value,
};
use crate::calculator::CalculationResponse;
use crate::regel::Context;

/// Calculation endpoint (GET {base_path}/behov?regelkontekst=...)
///
/// ## Flow:
/// 1. Read the id token from the configured cookie (401 when absent)
/// 2. Resolve the subject through the identity service
/// 3. Start, poll and fetch the calculation
/// 4. Return the projected result
///
/// The poll phase is cancelled if the client disconnects: axum drops this
/// future, the drop guard fires, and the poller stops at its next await.
pub async fn calculate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BehovQuery>,
) -> Result<Json<CalculationResponse>, ApiError> {
    let subject = authenticate(&state, &headers).await?;
    let context = Context::from_param(query.regelkontekst.as_deref());

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let response = state
        .calculator
        .compute_with_cancel(&subject, &context, &cancel)
        .await?;

    Ok(Json(response))
}

/// Header trusted callers authenticate with on the recalculation route.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Context every recalculation runs under.
pub const RECALCULATION_CONTEXT: &str = "corona";

/// Recalculation endpoint (POST {base_path}/behov/reberegning)
///
/// Not behind the id-token cookie. The caller sends the configured key in
/// `x-api-key` and names the person by national identity number:
///
/// ```json
/// { "fnr": "12345678901" }
/// ```
pub async fn recalculate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RecalculationRequest>, JsonRejection>,
) -> Result<Json<CalculationResponse>, ApiError> {
    let expected = state.config.server.recalculation_api_key.as_deref();
    let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match (expected, presented) {
        (Some(expected), Some(presented)) if expected == presented => {}
        _ => return Err(ApiError::Unauthorized("Not authenticated".to_string())),
    }

    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let fnr = request
        .fnr
        .filter(|fnr| !fnr.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing request information: fnr".to_string()))?;

    let subject = state.identity.resolve_person(fnr.trim()).await?;
    let context = Context::from(RECALCULATION_CONTEXT);

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let response = state
        .calculator
        .compute_with_cancel(&subject, &context, &cancel)
        .await?;

    Ok(Json(response))
}

/// Token check endpoint (GET {base_path}/auth)
pub async fn auth_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&state, &headers).await?;
    Ok((StatusCode::OK, "Gyldig token!"))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let cookie = &state.config.server.id_token_cookie;
    let id_token = cookie_value(headers, cookie).ok_or_else(|| {
        ApiError::Unauthorized(format!("Cookie with name {cookie} not found"))
    })?;

    Ok(state.identity.resolve(id_token).await?)
}

/// Liveness check (GET /isAlive)
pub async fn is_alive() -> impl IntoResponse {
    (StatusCode::OK, "ALIVE")
}

/// Readiness check (GET /isReady)
pub async fn is_ready() -> impl IntoResponse {
    (StatusCode::OK, "READY")
}

/// Prometheus exposition of the counters (GET /metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Turns a handler panic into a 500 problem response.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());

    ApiError::Internal(detail).into_response()
}
