//! Wire models for the rules engine (regel-api).
//!
//! A calculation is requested by POSTing a [`JobRequest`] ("behov") to
//! `{base}/behov`. The engine answers with a `Location` header pointing at a
//! status resource ([`PollLocation`]). Polling that resource yields
//! [`JobStatus::Pending`] until the engine redirects to the stored result
//! ([`ResultLocation`]), whose body is a [`CalculationResult`] ("subsumsjon").
//!
//! ```json
//! {
//!   "aktorId": "1234",
//!   "beregningsdato": "2024-05-01",
//!   "regelkontekst": { "type": "veiledning" },
//!   "antallBarn": 2
//! }
//! ```

use bon::Builder;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::observability::DEFAULT_CONTEXT_LABEL;

/// Prefix some rules-engine deployments put in front of returned locations.
const VERSIONED_PREFIX: &str = "/v1/";

/// The flow a calculation is requested from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Context {
    Soknad,
    Veiledning,
    Vedtak,
    Other(String),
    Unspecified,
}

impl Context {
    /// Parses the `regelkontekst` query parameter; absent or blank means
    /// [`Context::Unspecified`].
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Context::Unspecified,
            Some(value) => Context::from(value),
        }
    }

    /// Label used both on the wire and for the per-context counter.
    pub fn label(&self) -> &str {
        match self {
            Context::Soknad => "soknad",
            Context::Veiledning => "veiledning",
            Context::Vedtak => "vedtak",
            Context::Other(value) => value,
            Context::Unspecified => DEFAULT_CONTEXT_LABEL,
        }
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "soknad" => Context::Soknad,
            "veiledning" => Context::Veiledning,
            "vedtak" => Context::Vedtak,
            "" | DEFAULT_CONTEXT_LABEL => Context::Unspecified,
            _ => Context::Other(value.to_string()),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegelKontekst {
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Context> for RegelKontekst {
    fn from(value: &Context) -> Self {
        Self {
            kind: value.label().to_string(),
        }
    }
}

impl From<&RegelKontekst> for Context {
    fn from(value: &RegelKontekst) -> Self {
        Context::from(value.kind.as_str())
    }
}

/// A calculation job request ("behov").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[builder(into)]
    pub aktor_id: String,
    pub beregningsdato: NaiveDate,
    pub regelkontekst: RegelKontekst,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub har_avtjent_verneplikt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oppfyller_krav_til_fangst_og_fisk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuelt_grunnlag: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antall_barn: Option<u32>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inntekts_id: Option<String>,
}

impl JobRequest {
    pub fn context(&self) -> Context {
        Context::from(&self.regelkontekst)
    }
}

/// Strips a leading `/v1/` segment from a location returned by the engine.
pub fn normalize_location(raw: &str) -> String {
    match raw.strip_prefix(VERSIONED_PREFIX) {
        Some(rest) => format!("/{rest}"),
        None => raw.to_string(),
    }
}

/// Location of an in-flight job's status resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollLocation(String);

impl PollLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn from_header(raw: &str) -> Self {
        Self(normalize_location(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a completed job's stored result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLocation(String);

impl ResultLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn from_header(raw: &str) -> Self {
        Self(normalize_location(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Redirect(ResultLocation),
}

/// Body of a status resource while the job is still running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehovStatusResponse {
    pub status: String,
}

/// Raw result of a completed job ("subsumsjon").
///
/// Every sub-result is optional: the engine leaves one out when it did not
/// finish that part of the calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    #[serde(default)]
    pub behov_id: Option<String>,
    #[serde(default)]
    pub minsteinntekt_resultat: Option<MinimumIncomeResult>,
    #[serde(default)]
    pub sats_resultat: Option<RateResult>,
    #[serde(default)]
    pub periode_resultat: Option<PeriodResult>,
    #[serde(default)]
    pub grunnlag_resultat: Option<BasisResult>,
    #[serde(default)]
    pub problem: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimumIncomeResult {
    pub oppfyller_minsteinntekt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResult {
    pub ukesats: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodResult {
    pub periode_antall_uker: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasisResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub avkortet: Decimal,
    pub subsumsjons_id: String,
}
