//! Idempotency gate for redelivered webhooks.
//!
//! A logical event is identified by repository, pull request number and
//! delivery id. The first delivery with a key is accepted and the key is
//! recorded; every later delivery with the same key is a duplicate, even when
//! the original review job failed.

use crate::{DeliveryId, RepositoryName, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default time a recorded key is remembered.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Identity of a logical webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    /// Key for a delivery concerning a pull request.
    ///
    /// Format: `webhook:<owner>/<repo>:<pr>:<delivery_id>`
    pub fn new(repository: &RepositoryName, pr_number: u64, delivery_id: &DeliveryId) -> Self {
        Self(format!(
            "webhook:{}:{}:{}",
            repository.full_name(),
            pr_number,
            delivery_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable record of accepted keys.
///
/// Implementations must make `record_if_absent` atomic per key: under
/// concurrent calls with the same key exactly one caller observes `true`.
#[async_trait]
pub trait DeduplicationStore: Send + Sync {
    /// Record `key` unless it is already present.
    ///
    /// Returns `true` when the key was newly recorded and `false` when it was
    /// already present and unexpired.
    async fn record_if_absent(&self, key: &DedupKey, retention: Duration)
        -> Result<bool, StoreError>;
}

/// Decides whether a delivery repeats an already accepted event.
#[derive(Clone)]
pub struct IdempotencyGate {
    store: Arc<dyn DeduplicationStore>,
    retention: Duration,
}

impl IdempotencyGate {
    pub fn new(store: Arc<dyn DeduplicationStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Returns `true` if the key was already accepted. Otherwise the key is
    /// recorded as part of the same atomic step and `false` is returned.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the store; the caller must not dispatch
    /// when the outcome is unknown.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn is_duplicate_event(&self, key: &DedupKey) -> Result<bool, StoreError> {
        let recorded = self.store.record_if_absent(key, self.retention).await?;
        if !recorded {
            debug!("Delivery already accepted");
        }
        Ok(!recorded)
    }
}

impl fmt::Debug for IdempotencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotencyGate")
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
