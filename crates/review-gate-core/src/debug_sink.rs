//! Best-effort debug persistence.
//!
//! Accepted deliveries leave a snapshot just before dispatch, and review jobs
//! that fail after the response leave an error record. Neither write can
//! affect the response sent to GitHub.

use crate::review::{NormalizedReviewRequest, ReviewScope, TriggerMode};
use crate::{DeliveryId, InstallationId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use ulid::Ulid;

/// Record of an accepted delivery, written before the job is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub record_id: Ulid,
    pub delivery_id: DeliveryId,
    pub event_type: String,
    pub repository: String,
    pub pr_number: u64,
    pub installation_id: InstallationId,
    pub trigger: TriggerMode,
    pub scope: Option<ReviewScope>,
    /// When the webhook request arrived.
    pub received_at: Timestamp,
    pub recorded_at: Timestamp,
    /// Raw webhook body; `null` when it was not valid JSON.
    pub payload: serde_json::Value,
}

impl DebugSnapshot {
    pub fn new(
        delivery_id: &DeliveryId,
        event_type: &str,
        received_at: Timestamp,
        request: &NormalizedReviewRequest,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            record_id: Ulid::new(),
            delivery_id: delivery_id.clone(),
            event_type: event_type.to_string(),
            repository: request.repository.full_name(),
            pr_number: request.pr_number(),
            installation_id: request.installation_id,
            trigger: request.trigger,
            scope: request.scope,
            received_at,
            recorded_at: Timestamp::now(),
            payload,
        }
    }
}

/// Record of a review job that failed after the response was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugErrorRecord {
    pub record_id: Ulid,
    /// Event label, e.g. `webhook_async_error`.
    pub event: String,
    pub delivery_id: DeliveryId,
    pub event_type: String,
    pub repository: String,
    pub pr_number: u64,
    pub error: String,
    pub attempts: u32,
    pub recorded_at: Timestamp,
}

impl DebugErrorRecord {
    pub const ASYNC_ERROR_EVENT: &'static str = "webhook_async_error";

    pub fn async_failure(
        delivery_id: &DeliveryId,
        event_type: &str,
        request: &NormalizedReviewRequest,
        error: String,
        attempts: u32,
    ) -> Self {
        Self {
            record_id: Ulid::new(),
            event: Self::ASYNC_ERROR_EVENT.to_string(),
            delivery_id: delivery_id.clone(),
            event_type: event_type.to_string(),
            repository: request.repository.full_name(),
            pr_number: request.pr_number(),
            error,
            attempts,
            recorded_at: Timestamp::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DebugSinkError {
    #[error("Failed to serialize debug record: {message}")]
    Serialization { message: String },

    #[error("Failed to write debug record: {message}")]
    Io { message: String },
}

/// Destination for debug snapshots and error records.
#[async_trait]
pub trait DebugSink: Send + Sync {
    async fn persist_snapshot(&self, snapshot: &DebugSnapshot) -> Result<(), DebugSinkError>;

    async fn persist_error(&self, record: &DebugErrorRecord) -> Result<(), DebugSinkError>;
}

/// Sink that only emits structured log events. Used when no debug directory
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingDebugSink;

#[async_trait]
impl DebugSink for LoggingDebugSink {
    async fn persist_snapshot(&self, snapshot: &DebugSnapshot) -> Result<(), DebugSinkError> {
        info!(
            record_id = %snapshot.record_id,
            delivery_id = %snapshot.delivery_id,
            event_type = %snapshot.event_type,
            repository = %snapshot.repository,
            pr_number = snapshot.pr_number,
            trigger = %snapshot.trigger,
            received_at = %snapshot.received_at,
            "Debug snapshot"
        );
        Ok(())
    }

    async fn persist_error(&self, record: &DebugErrorRecord) -> Result<(), DebugSinkError> {
        error!(
            record_id = %record.record_id,
            event = %record.event,
            delivery_id = %record.delivery_id,
            event_type = %record.event_type,
            repository = %record.repository,
            pr_number = record.pr_number,
            attempts = record.attempts,
            error = %record.error,
            "Review job failed"
        );
        Ok(())
    }
}
