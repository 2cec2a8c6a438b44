//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the upstream base URL is usable as a prefix
//! - Keep the listener timeout above the upstream timeout, so a slow upstream
//!   is reported as 504 rather than cut off by the listener with 408
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("upstream.base_url: {0}")]
    InvalidUpstream(String),

    #[error(
        "listener.request_timeout_secs ({listener}) must exceed upstream.timeout_secs ({upstream})"
    )]
    TimeoutOrder { listener: u64, upstream: u64 },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.request_timeout_secs" });
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_size" });
    }

    if let Err(e) = check_upstream_base(&config.upstream.base_url) {
        errors.push(e);
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.timeout_secs" });
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.connect_timeout_secs" });
    }
    let listener_timeout = config.listener.request_timeout_secs;
    let upstream_timeout = config.upstream.timeout_secs;
    if listener_timeout > 0 && upstream_timeout > 0 && listener_timeout <= upstream_timeout {
        errors.push(ValidationError::TimeoutOrder {
            listener: listener_timeout,
            upstream: upstream_timeout,
        });
    }

    if config.rewrite.word_length == 0 {
        errors.push(ValidationError::Zero { field: "rewrite.word_length" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream_base(base: &str) -> Result<(), ValidationError> {
    let url = Url::parse(base)
        .map_err(|e| ValidationError::InvalidUpstream(format!("{base:?} does not parse: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::InvalidUpstream(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    // Links are rewritten by plain prefix substitution, so the base must
    // end where a path segment starts.
    if !base.ends_with('/') {
        return Err(ValidationError::InvalidUpstream(format!("{base:?} must end with '/'")));
    }
    Ok(())
}
