//! Bearer Token Extraction
//!
//! Pulls an access token out of the `Authorization` header. Absence of a
//! token is not an error here; whether anonymous access is allowed is the
//! caller's decision.

use axum::http::{HeaderMap, header};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract a bearer token from the Authorization header.
///
/// Returns `None` when the header is missing, is not valid UTF-8, does not
/// use the Bearer scheme, or carries an empty token. The scheme name is
/// matched case-insensitively per RFC 6750.
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    if value.len() <= BEARER_PREFIX.len() {
        return None;
    }

    let (scheme, token) = value.split_at(BEARER_PREFIX.len());
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
