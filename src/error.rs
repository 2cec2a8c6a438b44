//! Errors surfaced by one proxy cycle.
//!
//! Malformed markup and non-HTML bodies are not errors: the parser always
//! yields a tree and opaque bodies take the pass-through path.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connecting to or reading from the upstream failed.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    /// The upstream did not answer within the configured deadline.
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// The inbound path does not form a valid upstream URL.
    #[error("invalid upstream url {url:?}: {source}")]
    InvalidUpstreamUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The inbound body could not be read.
    #[error("failed to read request body: {0}")]
    RequestBody(String),
}

impl ProxyError {
    /// Status code returned to the caller for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::InvalidUpstreamUrl { .. } | ProxyError::RequestBody(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match &self {
            ProxyError::UpstreamUnreachable(_) => "Upstream request failed",
            ProxyError::UpstreamTimeout(_) => "Upstream request timed out",
            ProxyError::InvalidUpstreamUrl { .. } => "Invalid request URL",
            ProxyError::RequestBody(_) => "Invalid request body",
        };
        (self.status(), message).into_response()
    }
}

/// Failure while building the proxy from a validated configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid word pattern: {0}")]
    WordPattern(#[from] regex::Error),
}
