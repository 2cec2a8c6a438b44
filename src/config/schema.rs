//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Upstream origin every request is forwarded to.
pub const DEFAULT_UPSTREAM_BASE: &str = "https://habr.com/";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, inbound limits).
    pub listener: ListenerConfig,

    /// The single upstream host and how to reach it.
    pub upstream: UpstreamConfig,

    /// HTML rewriting settings.
    pub rewrite: RewriteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5000").
    pub bind_address: String,

    /// Total time allowed for one inbound request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            request_timeout_secs: 60,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream origin. Must end with `/`.
    pub base_url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total upstream call timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of redirects followed transparently (0 disables).
    pub max_redirects: usize,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE.to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 30,
            max_redirects: 10,
            system_proxy: true,
        }
    }
}

/// HTML rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Exact length of the words that get decorated.
    pub word_length: usize,

    /// Glyph appended after each decorated word.
    pub marker: char,

    /// Decorate words that already carry the marker again.
    pub redecorate: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            word_length: 6,
            marker: '\u{2122}',
            redecorate: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset (e.g. "info", "habraproxy=debug").
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "habraproxy=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
