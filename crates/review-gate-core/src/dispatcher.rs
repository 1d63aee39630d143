//! Fire-and-forget dispatch of review jobs.
//!
//! The coordinator hands each accepted delivery to [`Dispatcher::dispatch`],
//! which returns immediately. The job runs on the Tokio runtime after the HTTP
//! response has been sent. Failures (including panics) are written to the
//! debug sink and never reach the caller. In-flight jobs are tracked so the
//! server can drain them before shutting down.

use crate::debug_sink::{DebugErrorRecord, DebugSink};
use crate::review::DispatchJob;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{error, info, instrument, warn, Instrument};

// ============================================================================
// Review Processor
// ============================================================================

/// Runs the actual review for an accepted delivery.
#[async_trait]
pub trait ReviewProcessor: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ReviewError`] when the review could not be completed.
    async fn process(&self, job: &DispatchJob) -> Result<(), ReviewError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReviewError {
    /// Failure that may succeed on a later attempt.
    #[error("Transient review failure: {message}")]
    Transient { message: String },

    #[error("Review failed: {message}")]
    Permanent { message: String },

    #[error("Review failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ReviewError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Number of attempts the error represents.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RetriesExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

type FailureHook = Arc<dyn Fn(&DebugErrorRecord) + Send + Sync>;

/// Schedules review jobs and captures their failures.
#[derive(Clone)]
pub struct Dispatcher {
    processor: Arc<dyn ReviewProcessor>,
    sink: Arc<dyn DebugSink>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    dispatched: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    on_failure: Option<FailureHook>,
}

impl Dispatcher {
    pub fn new(processor: Arc<dyn ReviewProcessor>, sink: Arc<dyn DebugSink>) -> Self {
        Self {
            processor,
            sink,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            dispatched: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            on_failure: None,
        }
    }

    /// Register a callback invoked once for every failed job, after the error
    /// record was handed to the sink.
    pub fn with_failure_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebugErrorRecord) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Schedule `job` without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, job: DispatchJob) {
        let processor = self.processor.clone();
        let sink = self.sink.clone();
        let failed = self.failed.clone();
        let on_failure = self.on_failure.clone();

        let span = tracing::info_span!(
            "review_job",
            delivery_id = %job.delivery_id,
            repository = %job.request.repository,
            pr_number = job.request.pr_number(),
        );

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(
            run_job(processor, sink, failed, on_failure, job).instrument(span),
        );
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Wait until every job dispatched so far, and any dispatched while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = self.take_tasks();
            if tasks.is_empty() {
                return;
            }
            while tasks.join_next().await.is_some() {}
        }
    }

    /// Wait for in-flight jobs for at most `timeout`, then abort the rest.
    ///
    /// Returns `true` when every job finished in time.
    #[instrument(skip(self))]
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut tasks = self.take_tasks();
        let pending = tasks.len();
        if pending == 0 {
            return true;
        }

        info!(pending, "Draining in-flight review jobs");
        let finished = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !finished {
            warn!(
                remaining = tasks.len(),
                "Review jobs still running at shutdown deadline; aborting"
            );
            tasks.shutdown().await;
        }
        finished
    }

    fn take_tasks(&self) -> JoinSet<()> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *tasks)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("dispatched", &self.dispatched_count())
            .field("failed", &self.failed_count())
            .finish()
    }
}

/// Aborts the wrapped task when dropped, so aborting the job that awaits it
/// also stops the processor.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_job(
    processor: Arc<dyn ReviewProcessor>,
    sink: Arc<dyn DebugSink>,
    failed: Arc<AtomicU64>,
    on_failure: Option<FailureHook>,
    job: DispatchJob,
) {
    let context = job.clone();

    // Run in a nested task so a panicking processor surfaces as a JoinError.
    let outcome = AbortOnDrop(tokio::spawn(
        async move { processor.process(&job).await }.in_current_span(),
    ))
    .await;

    let (message, attempts) = match outcome {
        Ok(Ok(())) => {
            info!("Review job completed");
            return;
        }
        Ok(Err(e)) => (e.to_string(), e.attempts()),
        Err(join_error) if join_error.is_panic() => ("review job panicked".to_string(), 1),
        Err(join_error) => (join_error.to_string(), 1),
    };

    failed.fetch_add(1, Ordering::Relaxed);
    error!(error = %message, attempts, "Review job failed");

    let record = DebugErrorRecord::async_failure(
        &context.delivery_id,
        &context.event_type,
        &context.request,
        message,
        attempts,
    );

    if let Err(e) = sink.persist_error(&record).await {
        warn!(error = %e, "Failed to persist review job error");
    }

    if let Some(hook) = on_failure {
        hook(&record);
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
