//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use review_gate_core::IngestionError;
use serde_json::json;
use tracing::error;

/// Body returned for every unexpected failure. Internals stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Webhook handler errors with HTTP status code mapping
///
/// Pipeline outcomes (ignored, duplicate, rate limited and so on) are not
/// errors; they are mapped in [`crate::responses`]. This type only covers
/// requests the pipeline could not run to an outcome:
///
/// - `500 Internal Server Error`: a store or the allow-list failed
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// A collaborator of the ingestion pipeline failed
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Ingestion(ref e) => error!(error = %e, "Webhook ingestion failed"),
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
        )
            .into_response()
    }
}

/// Errors raised while starting or running the service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Startup failed: {message}")]
    StartupFailed { message: String },
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
