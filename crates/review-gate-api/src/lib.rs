//! # Review Gate HTTP Service
//!
//! HTTP server that receives GitHub webhooks and runs them through the
//! review-gate ingestion pipeline.
//!
//! This service provides:
//! - GitHub webhook endpoint with signature verification
//! - Health check endpoint
//! - Prometheus metrics endpoint
//! - Graceful shutdown that drains running review jobs

pub mod config;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod responses;

#[cfg(test)]
#[path = "test_support.rs"]
mod test_support;

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod shutdown_tests;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use review_gate_core::{Delivery, IngestionCoordinator, Timestamp, WebhookHeaders};
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info, instrument, warn};

pub use config::ServiceConfig;
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use pipeline::{build_coordinator, PipelineComponents};
pub use responses::{HealthCheckResult, HealthResponse};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Ingestion pipeline shared by every request
    pub coordinator: Arc<IngestionCoordinator>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        coordinator: Arc<IngestionCoordinator>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            coordinator,
            metrics,
        }
    }
}

// ============================================================================
// Router and Server
// ============================================================================

/// Build the HTTP router
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, post(handle_webhook));

    let health_routes = Router::new().route("/health", get(handle_health_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Binds to the configured address and serves until SIGINT or SIGTERM, then
/// drains running review jobs for at most the shutdown timeout.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    serve(listener, state, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` completes, then drain review jobs.
///
/// New connections stop being accepted as soon as `shutdown` resolves and
/// requests already in progress finish normally. Review jobs still running
/// after the shutdown timeout are aborted.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let drain_timeout = state.config.server.shutdown_timeout();
    let coordinator = state.coordinator.clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    let dispatcher = coordinator.dispatcher();
    info!(
        in_flight = dispatcher.in_flight(),
        timeout_seconds = drain_timeout.as_secs(),
        "HTTP server stopped, draining review jobs"
    );

    if dispatcher.drain(drain_timeout).await {
        info!("All review jobs finished");
    } else {
        warn!(
            timeout_seconds = drain_timeout.as_secs(),
            "Review jobs still running at shutdown were aborted"
        );
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle GitHub webhook requests
///
/// The synchronous pipeline runs to a terminal outcome before the response is
/// written; an accepted delivery's review job keeps running afterwards.
#[instrument(skip(state, headers, body), fields(body_size = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookHandlerError> {
    let started = Instant::now();

    // Convert headers to HashMap
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let webhook_headers = WebhookHeaders::from_http_headers(&header_map);
    let delivery = Delivery::new(webhook_headers, body);
    if delivery.delivery_id_generated {
        debug!(delivery_id = %delivery.delivery_id, "No delivery id supplied, generated one");
    }

    match state.coordinator.ingest(delivery).await {
        Ok(outcome) => {
            state
                .metrics
                .record_outcome(outcome.label(), started.elapsed());
            Ok(responses::outcome_response(outcome))
        }
        Err(e) => {
            state.metrics.record_error(started.elapsed());
            Err(WebhookHandlerError::Ingestion(e))
        }
    }
}

// ============================================================================
// Health and Observability
// ============================================================================

/// Basic health check
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = state.coordinator.dispatcher();
    let in_flight = dispatcher.in_flight();
    state.metrics.review_jobs_in_flight.set(in_flight as i64);

    let mut checks = HashMap::new();
    checks.insert(
        "dispatcher".to_string(),
        HealthCheckResult {
            healthy: true,
            message: format!(
                "{} review jobs in flight, {} dispatched, {} failed",
                in_flight,
                dispatcher.dispatched_count(),
                dispatcher.failed_count()
            ),
        },
    );

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Timestamp::now(),
        checks,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .review_jobs_in_flight
        .set(state.coordinator.dispatcher().in_flight() as i64);

    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Panics in a handler become the generic 500 body.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": errors::INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}

/// Request logging middleware with correlation ID
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    // Extract or generate correlation ID
    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
