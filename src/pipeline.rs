//! One proxy cycle.
//!
//! ```text
//! InboundRequest
//!     → UrlRewriter::to_upstream
//!     → filter_request_headers
//!     → UpstreamClient::forward
//!     → filter_response_headers
//!     → BodyKind::classify
//!         html:        decode → MarkupRewriter::rewrite → encode
//!         passthrough: bytes unchanged
//!     → OutboundResponse
//! ```
//!
//! The pipeline holds only read-only values and is shared by every request
//! through an `Arc`. HTML rewriting is CPU-bound and runs on the blocking
//! pool, off the async workers.

use axum::body::Bytes;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, SetupError};
use crate::http::content_type::{self, BodyKind};
use crate::http::headers::{filter_request_headers, filter_response_headers};
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResponse;
use crate::observability::metrics;
use crate::rewrite::MarkupRewriter;
use crate::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse, UrlRewriter};

/// Result of a successful cycle.
#[derive(Debug)]
pub struct Proxied {
    pub response: OutboundResponse,
    pub kind: BodyKind,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    urls: UrlRewriter,
    client: UpstreamClient,
    markup: MarkupRewriter,
}

impl Pipeline {
    pub fn new(config: &ProxyConfig) -> Result<Self, SetupError> {
        let urls = UrlRewriter::new(config.upstream.base_url.clone());
        let client = UpstreamClient::new(&config.upstream)?;
        let markup = MarkupRewriter::new(&config.rewrite, urls.clone())?;
        Ok(Self { urls, client, markup })
    }

    pub fn upstream_base(&self) -> &str {
        self.urls.upstream_base()
    }

    /// Forward `inbound` upstream and build the caller's response.
    pub async fn handle(&self, inbound: &InboundRequest) -> Result<Proxied, ProxyError> {
        let upstream_url = self.urls.to_upstream(&inbound.url, &inbound.caller_base);
        tracing::debug!(upstream_url = %upstream_url, "Forwarding to upstream");

        let upstream = self
            .client
            .forward(UpstreamRequest {
                method: inbound.method.clone(),
                url: &upstream_url,
                headers: filter_request_headers(&inbound.headers),
                body: inbound.body.clone(),
                cookies: &inbound.cookies,
            })
            .await?;

        let headers = filter_response_headers(&upstream.headers);
        let kind = BodyKind::classify(upstream.content_type.as_deref());
        let status = upstream.status;
        let body = match kind {
            BodyKind::Html => self.rewrite_html(upstream, &inbound.caller_base).await,
            BodyKind::Opaque => upstream.body,
        };

        Ok(Proxied {
            response: OutboundResponse { status, headers, body },
            kind,
        })
    }

    async fn rewrite_html(&self, upstream: UpstreamResponse, caller_base: &str) -> Bytes {
        let original = upstream.body.clone();
        let markup = self.markup.clone();
        let caller_base = caller_base.to_owned();

        tokio::task::spawn_blocking(move || rewrite_html_body(&markup, upstream, &caller_base))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "HTML rewrite task failed, passing body through");
                original
            })
    }
}

fn rewrite_html_body(markup: &MarkupRewriter, upstream: UpstreamResponse, caller_base: &str) -> Bytes {
    let content_type = upstream.content_type.as_deref();
    let encoding = content_type::html_encoding(content_type, &upstream.body);
    let rewritten = {
        let text = content_type::decode(&upstream.body, encoding);
        markup.rewrite(&text, caller_base)
    };

    match rewritten {
        Ok(rewritten) => {
            tracing::debug!(
                encoding = encoding.name(),
                decorated_nodes = rewritten.stats.decorated_nodes,
                decorated_words = rewritten.stats.decorated_words,
                rewritten_links = rewritten.stats.rewritten_links,
                "Rewrote HTML body"
            );
            metrics::record_rewrite(&rewritten.stats);
            Bytes::from(content_type::encode(&rewritten.html, encoding))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize rewritten HTML, passing body through");
            upstream.body
        }
    }
}
