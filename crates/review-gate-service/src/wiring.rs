//! Concrete collaborators for the ingestion pipeline.

use anyhow::Context;
use review_gate_api::{PipelineComponents, ServiceConfig};
use review_gate_core::{
    DebugSink, FilesystemDebugSink, GithubRestClient, HttpReviewForwarder, InMemoryStore,
    LoggingDebugSink, RetryingReviewProcessor,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the production collaborators described by `config`.
///
/// - GitHub REST client for mention triggers
/// - HTTP review forwarder wrapped in the retry policy
/// - Filesystem debug sink when a directory is configured, logging otherwise
/// - One in-process store serving both deduplication and rate limiting
pub async fn build_components(config: &ServiceConfig) -> anyhow::Result<PipelineComponents> {
    if config.github.token.is_none() {
        warn!("No GitHub token configured; pull request lookups are unauthenticated");
    }
    let fetcher = GithubRestClient::new(config.github.rest_config())
        .context("failed to create GitHub client")?;

    let endpoint = config
        .review
        .endpoint_url
        .as_deref()
        .context("review.endpoint_url is not configured")?;
    let forwarder = HttpReviewForwarder::new(endpoint, config.review.timeout())
        .context("failed to create review forwarder")?;
    let processor = RetryingReviewProcessor::new(Arc::new(forwarder), config.review.retry_policy());

    let debug_sink: Arc<dyn DebugSink> = match &config.debug.directory {
        Some(directory) => {
            let sink = FilesystemDebugSink::new(directory.clone())
                .await
                .with_context(|| {
                    format!("failed to prepare debug directory {}", directory.display())
                })?;
            info!(directory = %directory.display(), "Persisting debug records to filesystem");
            Arc::new(sink)
        }
        None => Arc::new(LoggingDebugSink),
    };

    let store = Arc::new(InMemoryStore::new());

    info!(
        github_api = %config.github.api_base_url,
        review_endpoint = %endpoint,
        max_attempts = config.review.max_attempts,
        "Pipeline collaborators created"
    );

    Ok(PipelineComponents {
        fetcher: Arc::new(fetcher),
        processor: Arc::new(processor),
        debug_sink,
        dedup_store: store.clone(),
        rate_limit_store: store,
    })
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
