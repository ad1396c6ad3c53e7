//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Serve the latest device telemetry on `/metrics`
//! - Relay everything else to the upstream while capturing both bodies

use std::borrow::Cow;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::capture::{redact_updates, CaptureSink, Direction, RequestDescriptor};
use crate::config::{ProxyConfig, UpstreamConfig};
use crate::http::request::{request_id, upstream_uri, MakeRequestUuidV4};
use crate::http::response::{strip_for_reframe, ProxyError};
use crate::observability::metrics;
use crate::telemetry::{MetricsSnapshot, Publisher};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub sink: Arc<CaptureSink>,
    pub snapshot: Arc<MetricsSnapshot>,
    pub upstream: UpstreamConfig,
    pub block_updates: bool,
    pub max_body_size: usize,
}

/// HTTP server for the capture proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// `snapshot` is shared with whoever else needs the latest telemetry.
    pub fn new(config: ProxyConfig, snapshot: Arc<MetricsSnapshot>, publisher: Publisher) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let sink = Arc::new(CaptureSink::new(&config, Arc::clone(&snapshot), publisher));

        let state = AppState {
            client,
            sink,
            snapshot,
            upstream: config.upstream.clone(),
            block_updates: config.capture.block_updates,
            max_body_size: config.security.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/favicon.ico", any(favicon_handler))
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` completes, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            data_dir = %self.config.storage.data_dir,
            block_updates = self.config.capture.block_updates,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("HTTP server draining");
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

/// Latest device telemetry in Prometheus text format.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.snapshot.read().await {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text.as_str().to_owned(),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(
                path = %state.snapshot.path().display(),
                error = %e,
                "No metrics snapshot available"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read metrics file").into_response()
        }
    }
}

async fn favicon_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Main proxy handler.
/// Captures the request, relays it, captures and relays the response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        remote = %remote,
        method = %method,
        path = %path,
        "Relaying request"
    );

    let response = match relay(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "Relay failed"
            );
            e.into_response()
        }
    };

    let status = response.status();
    metrics::record_request(method.as_str(), status.as_u16(), start_time);
    tracing::info!(
        request_id = %request_id,
        remote = %remote,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request relayed"
    );
    response
}

async fn relay(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(ProxyError::request_body)?;

    let descriptor = RequestDescriptor::from_parts(&parts.method, &parts.uri);
    state.sink.capture(&descriptor, &body, Direction::Request).await;

    let uri = upstream_uri(&parts.uri, &parts.headers, &state.upstream)?;
    let mut headers = parts.headers;
    strip_for_reframe(&mut headers);

    let mut upstream_request = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(Body::from(body))?;
    *upstream_request.headers_mut() = headers;

    let upstream_response = state.client.request(upstream_request).await?;
    let (mut response_parts, response_body) = upstream_response.into_parts();
    let response_body = axum::body::to_bytes(Body::new(response_body), state.max_body_size)
        .await
        .map_err(ProxyError::UpstreamBody)?;

    let response_body = if state.block_updates {
        redact_response(response_body)
    } else {
        response_body
    };

    state
        .sink
        .capture(&descriptor, &response_body, Direction::Response)
        .await;

    strip_for_reframe(&mut response_parts.headers);
    Ok(Response::from_parts(response_parts, Body::from(response_body)))
}

// Update offers must never reach the device.
fn redact_response(body: Bytes) -> Bytes {
    match redact_updates(&body) {
        Cow::Owned(redacted) => Bytes::from(redacted),
        Cow::Borrowed(_) => body.clone(),
    }
}
