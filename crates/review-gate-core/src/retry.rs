//! # Retry Policy
//!
//! Exponential backoff with jitter for review jobs, and a [`ReviewProcessor`]
//! decorator that retries transient failures of any backend.

use crate::dispatcher::{ReviewError, ReviewProcessor};
use crate::review::DispatchJob;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff configuration.
///
/// # Examples
///
/// ```rust
/// use review_gate_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// // Default policy: 3 attempts, 1s initial, 30s max, 2.0x multiplier
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
///
/// let policy = RetryPolicy::new(5, Duration::from_millis(200), Duration::from_secs(5), 1.5);
/// assert!(policy.should_retry(4));
/// assert!(!policy.should_retry(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Exponential growth factor
    pub backoff_multiplier: f64,

    pub use_jitter: bool,

    /// Jitter range as a fraction of the delay (0.25 = ±25%)
    pub jitter_percent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Set jitter fraction, clamped to `0.0..=1.0`.
    pub fn with_jitter_percent(mut self, percent: f64) -> Self {
        self.jitter_percent = percent.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// `initial * multiplier^retry`, capped at `max_delay`, then jittered.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.use_jitter {
            Self::add_jitter(capped, self.jitter_percent)
        } else {
            capped
        };

        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    fn add_jitter(delay_secs: f64, jitter_percent: f64) -> f64 {
        let range = delay_secs * jitter_percent;
        if range <= 0.0 {
            return delay_secs;
        }
        let jitter = rand::thread_rng().gen_range(-range..=range);
        (delay_secs + jitter).max(0.0)
    }
}

/// Tracks attempts for a single job.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, error: &ReviewError) {
        self.attempts += 1;
        self.last_error = Some(error.to_string());
    }
}

// ============================================================================
// RetryingReviewProcessor
// ============================================================================

/// Retries transient failures of the wrapped processor with backoff.
///
/// Permanent failures are returned after the first attempt. When every
/// attempt fails transiently the result is [`ReviewError::RetriesExhausted`].
pub struct RetryingReviewProcessor {
    inner: Arc<dyn ReviewProcessor>,
    policy: RetryPolicy,
}

impl RetryingReviewProcessor {
    pub fn new(inner: Arc<dyn ReviewProcessor>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ReviewProcessor for RetryingReviewProcessor {
    async fn process(&self, job: &DispatchJob) -> Result<(), ReviewError> {
        let mut state = RetryState::new();

        loop {
            match self.inner.process(job).await {
                Ok(()) => {
                    if state.attempts > 0 {
                        debug!(retries = state.attempts, "Review succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    state.record_failure(&e);

                    if !self.policy.should_retry(state.attempts) {
                        return Err(ReviewError::RetriesExhausted {
                            attempts: state.attempts,
                            last_error: state.last_error.unwrap_or_default(),
                        });
                    }

                    let delay = self.policy.calculate_delay(state.attempts - 1);
                    warn!(
                        attempt = state.attempts,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient review failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
