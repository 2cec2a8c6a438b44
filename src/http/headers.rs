//! Header exclusion policy.
//!
//! # Responsibilities
//! - Drop `host` before forwarding (the upstream client sets its own)
//! - Drop body-framing and connection headers before returning, since the
//!   outbound body length and encoding differ after rewriting
//!
//! # Design Decisions
//! - Exclusion sets are process-wide constants, read without locking
//! - `HeaderName` is always lower-case, so matching is case-insensitive
//! - Every other header (repeated values included) keeps its relative order

use axum::http::HeaderMap;

/// Request headers never forwarded upstream.
pub const REQUEST_HEADERS_EXCLUDE: &[&str] = &["host"];

/// Upstream response headers never copied to the caller.
pub const RESPONSE_HEADERS_EXCLUDE: &[&str] = &[
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "connection",
];

/// Copy `headers` without the names listed in `exclude`.
pub fn filter_headers(headers: &HeaderMap, exclude: &[&str]) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !exclude.contains(&name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    filter_headers(headers, REQUEST_HEADERS_EXCLUDE)
}

pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    filter_headers(headers, RESPONSE_HEADERS_EXCLUDE)
}
