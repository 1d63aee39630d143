//! In-process deduplication and rate-limit store.
//!
//! Each operation runs under a single lock, which makes it linearizable per
//! key within one process. Multi-instance deployments need a shared store
//! implementing the same traits.

use crate::dedup::{DedupKey, DeduplicationStore};
use crate::rate_limit::{RateLimitDecision, RateLimitStore};
use crate::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Entries beyond this count trigger a sweep of expired keys.
const DEFAULT_PRUNE_THRESHOLD: usize = 10_000;

// Expiry compares elapsed time with the period; `Instant + Duration` can
// overflow for very long periods.

#[derive(Debug, Clone, Copy)]
struct Recorded {
    at: Instant,
    retention: Duration,
}

impl Recorded {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.at) < self.retention
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn remaining(&self, window: Duration, now: Instant) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.started))
    }
}

/// Store backed by in-memory maps.
///
/// # Examples
///
/// ```rust
/// use review_gate_core::adapters::InMemoryStore;
/// use review_gate_core::dedup::{DedupKey, DeduplicationStore};
/// use review_gate_core::{DeliveryId, RepositoryName};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = InMemoryStore::new();
/// let key = DedupKey::new(&RepositoryName::parse("o/r").unwrap(), 1, &DeliveryId::new("d"));
///
/// assert!(store.record_if_absent(&key, Duration::from_secs(60)).await.unwrap());
/// assert!(!store.record_if_absent(&key, Duration::from_secs(60)).await.unwrap());
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    seen: Mutex<HashMap<String, Recorded>>,
    windows: Mutex<HashMap<String, Window>>,
    prune_threshold: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_prune_threshold(DEFAULT_PRUNE_THRESHOLD)
    }

    pub fn with_prune_threshold(prune_threshold: usize) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
            prune_threshold,
        }
    }

    /// Number of recorded dedup keys, expired or not.
    pub fn dedup_entries(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Slots used in the current window for `key`, `0` when no window is open.
    pub fn window_usage(&self, key: &str) -> u32 {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|w| w.count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DeduplicationStore for InMemoryStore {
    async fn record_if_absent(
        &self,
        key: &DedupKey,
        retention: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        if seen.len() > self.prune_threshold {
            let before = seen.len();
            seen.retain(|_, recorded| recorded.is_live(now));
            debug!(removed = before - seen.len(), "Pruned expired dedup keys");
        }

        match seen.get(key.as_str()) {
            Some(recorded) if recorded.is_live(now) => Ok(false),
            _ => {
                seen.insert(key.as_str().to_string(), Recorded { at: now, retention });
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn try_acquire(
        &self,
        key: &str,
        budget: u32,
        window: Duration,
    ) -> Result<RateLimitDecision, StoreError> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() > self.prune_threshold {
            windows.retain(|_, w| !w.remaining(window, now).is_zero());
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if entry.remaining(window, now).is_zero() {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < budget;
        if allowed {
            entry.count += 1;
        }

        Ok(RateLimitDecision {
            allowed,
            used: entry.count,
            budget,
            resets_in: entry.remaining(window, now),
        })
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
