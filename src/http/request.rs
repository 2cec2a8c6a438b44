//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing
//! - Derive the caller base URL the client used to reach the proxy
//! - Capture method, URL, headers, cookies and body as one immutable value
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An ID the proxy generated is logged and echoed to the caller, but never
//!   forwarded upstream; an ID the caller sent is forwarded as-is
//! - Body size limits enforced before the body is buffered
//! - The caller base comes from `Host` (and `X-Forwarded-Proto` when a TLS
//!   terminator sits in front), never from configuration

use axum::body::{Body, Bytes};
use axum::http::header::{COOKIE, HOST};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Uri};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Extension marking a request whose ID the proxy generated itself.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedRequestId;

/// Runs ahead of `SetRequestIdLayer` and records whether the caller sent
/// its own request ID.
pub async fn mark_generated_request_id(mut request: Request<Body>, next: Next) -> Response {
    if !request.headers().contains_key(X_REQUEST_ID) {
        request.extensions_mut().insert(GeneratedRequestId);
    }
    next.run(request).await
}

/// Read the request ID assigned to a request, for logging.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Everything the pipeline needs to know about one inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Full URL as seen by the caller: scheme, host, path and query.
    pub url: String,
    /// `scheme://host/` the caller used to reach the proxy.
    pub caller_base: String,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    pub body: Bytes,
}

impl InboundRequest {
    /// Build from request parts and an already buffered body.
    ///
    /// `fallback_host` is used when neither the `Host` header nor the URI
    /// carry an authority (bare HTTP/1.0 requests).
    pub fn from_parts(parts: &Parts, body: Bytes, fallback_host: &str) -> Self {
        let caller_base = caller_base(&parts.headers, &parts.uri, fallback_host);
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let relative = path_and_query.strip_prefix('/').unwrap_or(path_and_query);

        let mut headers = parts.headers.clone();
        if parts.extensions.get::<GeneratedRequestId>().is_some() {
            headers.remove(X_REQUEST_ID);
        }

        Self {
            method: parts.method.clone(),
            url: format!("{caller_base}{relative}"),
            caller_base,
            headers,
            cookies: parse_cookies(&parts.headers),
            body,
        }
    }
}

/// Derive `scheme://host/` for the caller.
pub fn caller_base(headers: &HeaderMap, uri: &Uri, fallback_host: &str) -> String {
    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|proto| *proto == "http" || *proto == "https")
        .unwrap_or("http");

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or(fallback_host);

    format!("{scheme}://{host}/")
}

/// Collect `name=value` pairs from every `Cookie` header, in order.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
