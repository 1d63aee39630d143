//! Ingestion pipeline.
//!
//! Runs a verified-or-not delivery through the gates in a fixed order:
//!
//! ```text
//! received -> signature-checked -> classified -> (mention-resolved)?
//!          -> draft-checked -> allow-listed -> dedup-checked -> rate-checked
//!          -> snapshot -> dispatched
//! ```
//!
//! Every gate can end the pipeline with a terminal [`IngestionOutcome`]. Only
//! a delivery that passes all of them is dispatched, exactly once.

use crate::allow_list::{AllowListError, RepositoryAllowList};
use crate::debug_sink::{DebugSink, DebugSnapshot};
use crate::dedup::{DedupKey, IdempotencyGate};
use crate::dispatcher::Dispatcher;
use crate::github::PullRequestFetcher;
use crate::rate_limit::RateLimiter;
use crate::review::{DispatchJob, NormalizedReviewRequest};
use crate::webhook::classifier::{Classification, EventClassifier, IgnoreReason, ReviewCandidate};
use crate::webhook::{Delivery, SignatureVerifier};
use crate::{DeliveryId, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

// ============================================================================
// Outcomes and Errors
// ============================================================================

/// Terminal result of ingesting one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    InvalidSignature,
    Ignored(IgnoreReason),
    InvalidRepository,
    /// Body of an in-scope event could not be parsed.
    MalformedPayload,
    SkipAcknowledged,
    FetchFailed,
    NotAllowed,
    Duplicate,
    RateLimited { retry_after: Duration },
    Accepted {
        delivery_id: DeliveryId,
        processing_time_ms: u64,
    },
}

impl IngestionOutcome {
    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::Ignored(_) => "ignored",
            Self::InvalidRepository => "invalid_repository",
            Self::MalformedPayload => "malformed_payload",
            Self::SkipAcknowledged => "skip_acknowledged",
            Self::FetchFailed => "fetch_failed",
            Self::NotAllowed => "not_allowed",
            Self::Duplicate => "duplicate",
            Self::RateLimited { .. } => "rate_limited",
            Self::Accepted { .. } => "accepted",
        }
    }
}

/// Unexpected failure in the synchronous path. Surfaces as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Allow-list failure: {0}")]
    AllowList(#[from] AllowListError),
}

// ============================================================================
// IngestionCoordinator
// ============================================================================

/// Collaborators the coordinator is built from.
pub struct CoordinatorParts {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub classifier: EventClassifier,
    pub fetcher: Arc<dyn PullRequestFetcher>,
    pub allow_list: Arc<dyn RepositoryAllowList>,
    pub idempotency: IdempotencyGate,
    pub rate_limiter: RateLimiter,
    pub debug_sink: Arc<dyn DebugSink>,
    pub dispatcher: Dispatcher,
}

pub struct IngestionCoordinator {
    verifier: Arc<dyn SignatureVerifier>,
    classifier: EventClassifier,
    fetcher: Arc<dyn PullRequestFetcher>,
    allow_list: Arc<dyn RepositoryAllowList>,
    idempotency: IdempotencyGate,
    rate_limiter: RateLimiter,
    debug_sink: Arc<dyn DebugSink>,
    dispatcher: Dispatcher,
}

impl IngestionCoordinator {
    pub fn new(parts: CoordinatorParts) -> Self {
        Self {
            verifier: parts.verifier,
            classifier: parts.classifier,
            fetcher: parts.fetcher,
            allow_list: parts.allow_list,
            idempotency: parts.idempotency,
            rate_limiter: parts.rate_limiter,
            debug_sink: parts.debug_sink,
            dispatcher: parts.dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one delivery through the pipeline.
    ///
    /// Returns as soon as the outcome is known; an accepted delivery's review
    /// job keeps running on the dispatcher afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError`] when a store or the allow-list fails. No job
    /// is dispatched in that case.
    #[instrument(
        skip(self, delivery),
        fields(delivery_id = %delivery.delivery_id, event_type = %delivery.kind)
    )]
    pub async fn ingest(&self, delivery: Delivery) -> Result<IngestionOutcome, IngestionError> {
        let started = Instant::now();

        if !self
            .verifier
            .verify(&delivery.body, delivery.signature.as_deref())
            .await
        {
            let secret_length = self.verifier.secret_length();
            warn!(
                has_signature = delivery.signature.is_some(),
                has_secret = secret_length > 0,
                secret_length,
                "Webhook signature verification failed"
            );
            return Ok(IngestionOutcome::InvalidSignature);
        }

        let classification = match self.classifier.classify(&delivery.kind, &delivery.body) {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed payload");
                return Ok(IngestionOutcome::MalformedPayload);
            }
        };

        let request = match classification {
            Classification::Ignored(reason) => {
                info!(reason = reason.as_str(), "Delivery ignored");
                return Ok(IngestionOutcome::Ignored(reason));
            }
            Classification::InvalidRepository { full_name } => {
                info!(repository = %full_name, "Invalid repository name");
                return Ok(IngestionOutcome::InvalidRepository);
            }
            Classification::SkipAcknowledged {
                repository,
                pr_number,
            } => {
                info!(repository = %repository, pr_number, "Skip command acknowledged");
                return Ok(IngestionOutcome::SkipAcknowledged);
            }
            Classification::Candidate(ReviewCandidate::Direct(request)) => request,
            Classification::Candidate(ReviewCandidate::Mention(trigger)) => {
                info!(
                    repository = %trigger.repository,
                    pr_number = trigger.pr_number,
                    scope = %trigger.scope,
                    commenter = trigger.commenter.as_deref().unwrap_or("unknown"),
                    "Review mention detected"
                );
                match self
                    .fetcher
                    .fetch_pull_request(
                        &trigger.repository,
                        trigger.pr_number,
                        trigger.installation_id,
                    )
                    .await
                {
                    Ok(pull_request) => NormalizedReviewRequest::from_mention(
                        trigger.repository,
                        pull_request,
                        trigger.installation_id,
                        trigger.scope,
                    ),
                    Err(e) => {
                        error!(error = %e, transient = e.is_transient(), "Failed to fetch pull request");
                        return Ok(IngestionOutcome::FetchFailed);
                    }
                }
            }
        };

        if request.is_draft() {
            info!(pr_number = request.pr_number(), "Draft pull request ignored");
            return Ok(IngestionOutcome::Ignored(IgnoreReason::Draft));
        }

        self.admit(delivery, request, started).await
    }

    /// Allow-list, dedup and rate-limit gates, then snapshot and dispatch.
    async fn admit(
        &self,
        delivery: Delivery,
        request: NormalizedReviewRequest,
        started: Instant,
    ) -> Result<IngestionOutcome, IngestionError> {
        let repository = &request.repository;

        if !self
            .allow_list
            .is_allowed(repository.owner(), repository.name())
            .await?
        {
            info!(repository = %repository, "Repository not on allowed list");
            return Ok(IngestionOutcome::NotAllowed);
        }

        let key = DedupKey::new(repository, request.pr_number(), &delivery.delivery_id);
        if self.idempotency.is_duplicate_event(&key).await? {
            info!(key = %key, "Duplicate delivery");
            return Ok(IngestionOutcome::Duplicate);
        }

        let decision = self
            .rate_limiter
            .check_rate_limit(request.installation_id)
            .await?;
        if !decision.allowed {
            return Ok(IngestionOutcome::RateLimited {
                retry_after: decision.resets_in,
            });
        }

        let event_type = delivery.kind.as_str().to_string();
        let payload = serde_json::from_slice(&delivery.body).unwrap_or(serde_json::Value::Null);
        let snapshot = DebugSnapshot::new(
            &delivery.delivery_id,
            &event_type,
            delivery.received_at,
            &request,
            payload,
        );
        if let Err(e) = self.debug_sink.persist_snapshot(&snapshot).await {
            warn!(error = %e, "Failed to persist debug snapshot; dispatching anyway");
        }

        let delivery_id = delivery.delivery_id;
        debug!(
            repository = %request.repository,
            pr_number = request.pr_number(),
            trigger = %request.trigger,
            "Dispatching review job"
        );
        self.dispatcher
            .dispatch(DispatchJob::new(delivery_id.clone(), event_type, request));

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(processing_time_ms, "Review processing started");

        Ok(IngestionOutcome::Accepted {
            delivery_id,
            processing_time_ms,
        })
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
