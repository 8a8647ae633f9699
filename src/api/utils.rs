//! API utility functions
//!
//! Pure, stateless helpers for HTTP request processing.

use axum::http::{HeaderMap, header::COOKIE};

/// Returns the value of cookie `name`, looking through every `Cookie` header.
///
/// Empty values are treated as absent.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}
