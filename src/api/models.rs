//! API models for the kalkulator endpoints.
//!
//! `GET {base_path}/behov?regelkontekst=veiledning` answers with a
//! [`CalculationResponse`](crate::calculator::CalculationResponse):
//!
//! ```json
//! {
//!   "oppfyllerMinsteinntekt": true,
//!   "ukesats": 123,
//!   "periodeAntallUker": 52,
//!   "avkortetGrunnlag": 20.5,
//!   "subsumsjonId": "01E5..."
//! }
//! ```
//!
//! `POST {base_path}/behov/reberegning` takes a [`RecalculationRequest`]
//! from trusted callers authenticated by the `x-api-key` header, and answers
//! with the same response shape.
//!
//! Failures answer with a [`Problem`] body.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct BehovQuery {
    #[serde(default)]
    pub regelkontekst: Option<String>,
}

/// Body of `POST {base_path}/behov/reberegning`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecalculationRequest {
    #[serde(default)]
    pub fnr: Option<String>,
}

/// Problem details body for error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
