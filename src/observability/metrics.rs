//! Metrics collection and exposition.
//!
//! # Metrics
//! - `habraproxy_requests_total` (counter): requests by method, status, body kind
//! - `habraproxy_request_duration_seconds` (histogram): full cycle latency
//! - `habraproxy_rewritten_total` (counter): decorated words / rewritten links
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call is
//!   a no-op, so tests need no setup
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::rewrite::RewriteStats;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished proxy cycle.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "habraproxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "kind" => kind
    )
    .increment(1);
    metrics::histogram!(
        "habraproxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "kind" => kind
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record what one HTML rewrite changed.
pub fn record_rewrite(stats: &RewriteStats) {
    metrics::counter!("habraproxy_rewritten_total", "what" => "words")
        .increment(stats.decorated_words as u64);
    metrics::counter!("habraproxy_rewritten_total", "what" => "links")
        .increment(stats.rewritten_links as u64);
}
