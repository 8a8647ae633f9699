//! The calculation use case: start a behov, wait for it, project the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::observability::Metrics;
use crate::regel::{
    CalculationResult, Context, JobClient, RegelApiError, ResultFetcher, StatusPoller,
};

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error(transparent)]
    RegelApi(#[from] RegelApiError),

    #[error("incomplete result from regel-api: missing {missing}")]
    IncompleteResult { missing: &'static str },
}

/// Whether the capped basis (`grunnlagResultat`) must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BasisPolicy {
    #[default]
    Optional,
    Required,
}

/// Caller-facing projection of a subsumsjon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    pub oppfyller_minsteinntekt: bool,
    pub ukesats: i32,
    pub periode_antall_uker: i32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub avkortet_grunnlag: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsumsjon_id: Option<String>,
}

/// Validates a raw result against the mandatory set and projects it.
///
/// Mandatory: `minsteinntektResultat`, `satsResultat`, `periodeResultat`,
/// and `grunnlagResultat` under [`BasisPolicy::Required`].
pub fn project(
    result: CalculationResult,
    basis: BasisPolicy,
) -> Result<CalculationResponse, CalculationError> {
    let missing = |missing| CalculationError::IncompleteResult { missing };

    let minsteinntekt = result
        .minsteinntekt_resultat
        .ok_or_else(|| missing("minsteinntektResultat"))?;
    let sats = result.sats_resultat.ok_or_else(|| missing("satsResultat"))?;
    let periode = result
        .periode_resultat
        .ok_or_else(|| missing("periodeResultat"))?;
    let grunnlag = match (basis, result.grunnlag_resultat) {
        (BasisPolicy::Required, None) => return Err(missing("grunnlagResultat")),
        (_, grunnlag) => grunnlag,
    };

    let (avkortet_grunnlag, subsumsjon_id) = match grunnlag {
        Some(grunnlag) => (Some(grunnlag.avkortet), Some(grunnlag.subsumsjons_id)),
        None => (None, None),
    };

    Ok(CalculationResponse {
        oppfyller_minsteinntekt: minsteinntekt.oppfyller_minsteinntekt,
        ukesats: sats.ukesats,
        periode_antall_uker: periode.periode_antall_uker,
        avkortet_grunnlag,
        subsumsjon_id,
    })
}

/// Sequences start, poll and fetch for one subject.
pub struct Calculator {
    jobs: Arc<dyn JobClient>,
    poller: StatusPoller,
    results: Arc<dyn ResultFetcher>,
    metrics: Arc<Metrics>,
    basis: BasisPolicy,
}

impl Calculator {
    pub fn new(
        jobs: Arc<dyn JobClient>,
        poller: StatusPoller,
        results: Arc<dyn ResultFetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            jobs,
            poller,
            results,
            metrics,
            basis: BasisPolicy::default(),
        }
    }

    pub fn with_basis_policy(mut self, basis: BasisPolicy) -> Self {
        self.basis = basis;
        self
    }

    pub fn basis_policy(&self) -> BasisPolicy {
        self.basis
    }

    pub async fn compute(
        &self,
        subject: &str,
        context: &Context,
    ) -> Result<CalculationResponse, CalculationError> {
        self.compute_with_cancel(subject, context, &CancellationToken::new())
            .await
    }

    /// Like [`Calculator::compute`]; cancelling `cancel` aborts the poll phase.
    pub async fn compute_with_cancel(
        &self,
        subject: &str,
        context: &Context,
        cancel: &CancellationToken,
    ) -> Result<CalculationResponse, CalculationError> {
        let span = info_span!("compute", call_id = %Uuid::new_v4(), kontekst = %context);

        async move {
            info!("Starting behov");
            let poll_location = self.jobs.start(subject, context).await?;

            let result_location = self.poller.poll(&poll_location, cancel).await?;

            let result = self.results.fetch(&result_location).await?;

            let response = project(result, self.basis).inspect_err(|err| {
                warn!(error = %err, location = %result_location, "Subsumsjon incomplete");
            })?;

            self.metrics
                .minimum_income_decided(response.oppfyller_minsteinntekt);
            info!(
                oppfyller_minsteinntekt = response.oppfyller_minsteinntekt,
                "Calculation completed"
            );

            Ok(response)
        }
        .instrument(span)
        .await
    }
}
