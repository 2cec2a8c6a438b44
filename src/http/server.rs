//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router accepting any method on any path
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Buffer the inbound request and hand it to the proxy pipeline
//! - Map pipeline results and errors to HTTP responses
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, SetupError};
use crate::http::request::{
    mark_generated_request_id, request_id, InboundRequest, MakeRequestUuidV4,
};
use crate::observability::metrics;
use crate::pipeline::Pipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_body_size: usize,
    /// Host used for the caller base when a request carries none.
    pub fallback_host: String,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let pipeline = Arc::new(Pipeline::new(&config)?);
        let state = AppState {
            pipeline,
            max_body_size: config.listener.max_body_size,
            fallback_host: config.listener.bind_address.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.listener.request_timeout_secs,
                    ))),
            )
            .layer(middleware::from_fn(mark_generated_request_id))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: one full proxy cycle per inbound request.
///
/// If the client disconnects, axum drops this future and the in-flight
/// upstream call with it.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        client = %client,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = ProxyError::RequestBody(e.to_string());
            tracing::warn!(request_id = %request_id, error = %err, "Rejected request body");
            metrics::record_request(&method, err.status().as_u16(), "error", start_time);
            return err.into_response();
        }
    };

    let inbound = InboundRequest::from_parts(&parts, body, &state.fallback_host);

    match state.pipeline.handle(&inbound).await {
        Ok(proxied) => {
            let status = proxied.response.status;
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = status.as_u16(),
                kind = proxied.kind.as_str(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Proxied request"
            );
            metrics::record_request(&method, status.as_u16(), proxied.kind.as_str(), start_time);
            proxied.response.into_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                upstream = %state.pipeline.upstream_base(),
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, e.status().as_u16(), "error", start_time);
            e.into_response()
        }
    }
}
