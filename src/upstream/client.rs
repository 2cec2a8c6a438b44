//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Issue exactly one request per proxy cycle to the upstream host
//! - Carry over method, filtered headers, raw body and cookies
//! - Buffer the whole response body for the content-type router
//!
//! # Design Decisions
//! - No retries; failures surface immediately as `ProxyError`
//! - Redirects are followed transparently (bounded by `max_redirects`)
//! - Compressed bodies are decoded by the transport, so the pipeline only
//!   ever sees identity-encoded bytes. The caller's `Accept-Encoding` is
//!   replaced by the codings the transport can decode
//! - Every call is bounded by the configured timeout; dropping the returned
//!   future abandons the call

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

/// One request to forward upstream.
#[derive(Debug)]
pub struct UpstreamRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub cookies: &'a [(String, String)],
}

/// A fully buffered upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Content-Type exactly as declared by the upstream.
    pub content_type: Option<String>,
}

/// Shared handle to the upstream transport.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let redirect = if config.max_redirects == 0 {
            Policy::none()
        } else {
            Policy::limited(config.max_redirects)
        };

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(timeout)
            .redirect(redirect);
        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            timeout,
        })
    }

    /// Forward a request and buffer the response.
    pub async fn forward(&self, request: UpstreamRequest<'_>) -> Result<UpstreamResponse, ProxyError> {
        let url = Url::parse(request.url).map_err(|source| ProxyError::InvalidUpstreamUrl {
            url: request.url.to_string(),
            source,
        })?;

        let mut headers = request.headers;
        headers.remove(ACCEPT_ENCODING);
        if let Some(cookie) = cookie_header(request.cookies) {
            headers.insert(COOKIE, cookie);
        }

        let mut builder = self.client.request(request.method, url).headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
            content_type,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ProxyError {
        if error.is_timeout() {
            ProxyError::UpstreamTimeout(self.timeout)
        } else {
            ProxyError::UpstreamUnreachable(error)
        }
    }
}

/// Serialize a cookie set into a single `Cookie` header value.
fn cookie_header(cookies: &[(String, String)]) -> Option<HeaderValue> {
    if cookies.is_empty() {
        return None;
    }
    let joined = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_str(&joined).ok()
}
