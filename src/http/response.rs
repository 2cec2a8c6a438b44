//! Outbound response assembly.
//!
//! # Responsibilities
//! - Carry the upstream status, filtered headers and final body back to axum
//!
//! # Design Decisions
//! - The body is fully buffered, so hyper sets `Content-Length` itself;
//!   the upstream framing headers were already dropped by the header filter
//! - Upstream failures are mapped to gateway status codes by `ProxyError`

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

/// Response produced by one proxy cycle.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
