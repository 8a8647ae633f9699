//! Client for the downstream rules engine (regel-api)
//!
//! One calculation is three calls against the same deployment:
//!
//! 1. [`JobClient::start`] POSTs a behov and receives a poll location
//! 2. [`StatusPoller::poll`] checks that location until it redirects
//! 3. [`ResultFetcher::fetch`] reads the subsumsjon behind the redirect
//!
//! The HTTP implementations share one [`RegelApi`] and therefore one
//! connection pool and credential source.

mod auth;
mod error;
mod fetcher;
mod http;
pub mod models;
mod poller;
mod starter;

pub use auth::{AuthError, StaticTokenProvider, TokenProvider};
pub use error::{RegelApiError, Result};
pub use fetcher::{RegelApiResultFetcher, ResultFetcher};
pub use http::{API_KEY_HEADER, HttpConfig, RegelApi};
pub use models::{
    CalculationResult, Context, JobRequest, JobStatus, PollLocation, ResultLocation,
};
pub use poller::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, RegelApiStatusCheck, StatusCheck, StatusPoller,
};
pub use starter::{JobClient, RegelApiJobClient};
