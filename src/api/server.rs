use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use super::{
    services::{auth_check, calculate, is_alive, is_ready, metrics, panic_response, recalculate},
    state::AppState,
};
use crate::calculator::Calculator;
use crate::config::Config;
use crate::identity::HttpIdentityResolver;
use crate::observability::Metrics;
use crate::regel::{
    RegelApi, RegelApiJobClient, RegelApiResultFetcher, RegelApiStatusCheck, StaticTokenProvider,
    StatusPoller,
};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wires the HTTP clients and the calculator from configuration.
pub fn build_state(config: Config) -> Result<AppState, AnyError> {
    let metrics = Arc::new(Metrics::new());

    let regel_api = &config.regel_api;
    let http = regel_api.http();
    let api = RegelApi::new(
        &regel_api.base_url,
        &http,
        Arc::new(StaticTokenProvider::new(regel_api.token.clone())),
        regel_api.api_key.clone(),
    )?;
    info!(base_url = api.base_url(), "Using regel-api");

    let poller = StatusPoller::new(Arc::new(RegelApiStatusCheck::new(api.clone())))
        .with_interval(regel_api.poll_interval.as_duration())
        .with_timeout(regel_api.poll_timeout.as_duration());

    let calculator = Calculator::new(
        Arc::new(RegelApiJobClient::new(api.clone(), metrics.clone())),
        poller,
        Arc::new(RegelApiResultFetcher::new(api)),
        metrics.clone(),
    )
    .with_basis_policy(config.calculation.basis);

    let identity = HttpIdentityResolver::new(
        config.identity.url.clone(),
        &http,
        Arc::new(StaticTokenProvider::new(config.identity.token.clone())),
    )?;

    Ok(AppState::new(config, calculator, Arc::new(identity), metrics))
}

pub fn router(state: AppState) -> Router {
    let base_path = state.config.server.base_path.trim_end_matches('/').to_string();

    Router::new()
        .route(&format!("{base_path}/behov"), get(calculate))
        .route(&format!("{base_path}/behov/reberegning"), post(recalculate))
        .route(&format!("{base_path}/auth"), get(auth_check))
        .route("/isAlive", get(is_alive))
        .route("/isReady", get(is_ready))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;
    let state = build_state(config)?;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Kalkulator API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
