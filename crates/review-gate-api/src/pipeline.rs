//! Assembly of the ingestion coordinator from configuration.
//!
//! The policy parts (signature secret, bot identity, mention handle,
//! allow-list, budgets, retention) come from [`ServiceConfig`]; the parts that
//! talk to the outside world are injected so tests can replace them.

use crate::config::ServiceConfig;
use crate::errors::ConfigError;
use crate::metrics::ServiceMetrics;
use review_gate_core::webhook::EventClassifier;
use review_gate_core::{
    CoordinatorParts, DebugSink, DeduplicationStore, Dispatcher, HmacSignatureVerifier,
    IdempotencyGate, IngestionCoordinator, PullRequestFetcher, RateLimitStore, RateLimiter,
    ReviewProcessor,
};
use std::sync::Arc;
use tracing::info;

/// Collaborators that reach outside the process.
#[derive(Clone)]
pub struct PipelineComponents {
    pub fetcher: Arc<dyn PullRequestFetcher>,
    pub processor: Arc<dyn ReviewProcessor>,
    pub debug_sink: Arc<dyn DebugSink>,
    pub dedup_store: Arc<dyn DeduplicationStore>,
    pub rate_limit_store: Arc<dyn RateLimitStore>,
}

/// Build the coordinator for `config`.
///
/// Failed review jobs increment `review_jobs_failed_total` on `metrics`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the mention handle or an allow-list
/// pattern cannot be used.
pub fn build_coordinator(
    config: &ServiceConfig,
    components: PipelineComponents,
    metrics: Arc<ServiceMetrics>,
) -> Result<IngestionCoordinator, ConfigError> {
    let classifier = EventClassifier::new(
        config.webhooks.bot_identity.clone(),
        config.webhooks.mention_parser()?,
    );
    let allow_list = config.allow_list.build()?;

    let dispatcher = Dispatcher::new(components.processor, components.debug_sink.clone())
        .with_failure_hook(move |_record| metrics.review_jobs_failed_total.inc());

    info!(
        bot_identity = %config.webhooks.bot_identity,
        mention_handle = config.webhooks.effective_mention_handle(),
        allow_all = config.allow_list.allow_all,
        allowed_patterns = config.allow_list.repositories.len(),
        rate_limit_budget = config.rate_limit.default_budget,
        rate_limit_window_seconds = config.rate_limit.window_seconds,
        dedup_retention_seconds = config.deduplication.retention_seconds,
        "Ingestion pipeline configured"
    );

    Ok(IngestionCoordinator::new(CoordinatorParts {
        verifier: Arc::new(HmacSignatureVerifier::new(config.webhooks.webhook_secret())),
        classifier,
        fetcher: components.fetcher,
        allow_list: Arc::new(allow_list),
        idempotency: IdempotencyGate::new(
            components.dedup_store,
            config.deduplication.retention(),
        ),
        rate_limiter: RateLimiter::new(components.rate_limit_store, config.rate_limit.policy()),
        debug_sink: components.debug_sink,
        dispatcher,
    }))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
