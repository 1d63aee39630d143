//! Response types and the mapping from pipeline outcome to HTTP response.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use review_gate_core::{DeliveryId, IngestionOutcome, Timestamp};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// Response Types
// ============================================================================

/// Informational reply for deliveries that end without a review
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Reply for failures the sender is expected to act on
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Reply for an accepted delivery
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAcceptedResponse {
    pub message: String,
    pub delivery_id: DeliveryId,
    /// Milliseconds spent in the synchronous pipeline
    pub processing_time: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub checks: HashMap<String, HealthCheckResult>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
}

// ============================================================================
// Outcome Mapping
// ============================================================================

fn message(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
        .into_response()
}

fn error(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: text.to_string(),
        }),
    )
        .into_response()
}

/// Convert a terminal pipeline outcome into the reply GitHub receives.
///
/// | Outcome | Status | Body |
/// |---|---|---|
/// | invalid signature | 401 | `{"error":"Invalid signature"}` |
/// | ignored | 200 | `{"message":"<reason>"}` |
/// | invalid repository | 400 | `{"message":"Invalid repository name"}` |
/// | malformed payload | 400 | `{"error":"Invalid payload"}` |
/// | skip | 200 | `{"message":"Skip command acknowledged"}` |
/// | fetch failure | 500 | `{"error":"Failed to fetch pull request"}` |
/// | not allowed | 200 | `{"message":"Repository not on allowed list"}` |
/// | duplicate | 200 | `{"message":"Duplicate event"}` |
/// | rate limited | 429 | `{"error":"Rate limit exceeded"}` plus `Retry-After` |
/// | accepted | 200 | `{"message":"Review processing started","deliveryId":..,"processingTime":..}` |
pub fn outcome_response(outcome: IngestionOutcome) -> Response {
    match outcome {
        IngestionOutcome::InvalidSignature => error(StatusCode::UNAUTHORIZED, "Invalid signature"),
        IngestionOutcome::Ignored(reason) => message(StatusCode::OK, reason.message()),
        IngestionOutcome::InvalidRepository => {
            message(StatusCode::BAD_REQUEST, "Invalid repository name")
        }
        IngestionOutcome::MalformedPayload => error(StatusCode::BAD_REQUEST, "Invalid payload"),
        IngestionOutcome::SkipAcknowledged => message(StatusCode::OK, "Skip command acknowledged"),
        IngestionOutcome::FetchFailed => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch pull request",
        ),
        IngestionOutcome::NotAllowed => message(StatusCode::OK, "Repository not on allowed list"),
        IngestionOutcome::Duplicate => message(StatusCode::OK, "Duplicate event"),
        IngestionOutcome::RateLimited { retry_after } => {
            let mut response = error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
            // Whole seconds, rounded up.
            let seconds = retry_after
                .as_secs()
                .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
            if let Ok(value) = HeaderValue::from_str(&seconds.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        IngestionOutcome::Accepted {
            delivery_id,
            processing_time_ms,
        } => (
            StatusCode::OK,
            Json(WebhookAcceptedResponse {
                message: "Review processing started".to_string(),
                delivery_id,
                processing_time: processing_time_ms,
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
#[path = "responses_tests.rs"]
mod tests;
