//! Per-installation rate limiting of accepted review triggers.
//!
//! Each installation has a budget of accepted deliveries per fixed window.
//! The unknown installation (`0`) always gets the default budget, shared by
//! every delivery that carries no installation.

use crate::{InstallationId, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Budget configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub default_budget: u32,
    pub window: Duration,
    pub overrides: HashMap<u64, u32>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            default_budget: 60,
            window: Duration::from_secs(60 * 60),
            overrides: HashMap::new(),
        }
    }
}

impl RateLimitPolicy {
    pub fn new(default_budget: u32, window: Duration) -> Self {
        Self {
            default_budget,
            window,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, installation: InstallationId, budget: u32) -> Self {
        self.overrides.insert(installation.as_u64(), budget);
        self
    }

    /// Budget for an installation; overrides never apply to the unknown sentinel.
    pub fn budget_for(&self, installation: InstallationId) -> u32 {
        if installation.is_unknown() {
            return self.default_budget;
        }
        self.overrides
            .get(&installation.as_u64())
            .copied()
            .unwrap_or(self.default_budget)
    }
}

/// Result of one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Slots consumed in the current window, including this one when allowed.
    pub used: u32,
    pub budget: u32,
    /// Time until the current window resets.
    pub resets_in: Duration,
}

/// Durable counter store.
///
/// `try_acquire` must be an atomic check-and-increment per key: the counter is
/// only incremented when the result is `allowed`.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn try_acquire(
        &self,
        key: &str,
        budget: u32,
        window: Duration,
    ) -> Result<RateLimitDecision, StoreError>;
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Consume one slot of the installation's budget if any remain.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the store.
    #[instrument(skip(self), fields(installation_id = %installation))]
    pub async fn check_rate_limit(
        &self,
        installation: InstallationId,
    ) -> Result<RateLimitDecision, StoreError> {
        let budget = self.policy.budget_for(installation);
        let key = format!("ratelimit:installation:{}", installation);

        let decision = self
            .store
            .try_acquire(&key, budget, self.policy.window)
            .await?;

        if !decision.allowed {
            warn!(
                used = decision.used,
                budget = decision.budget,
                resets_in_secs = decision.resets_in.as_secs(),
                "Installation rate limit exceeded"
            );
        }

        Ok(decision)
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
