//! Prometheus metrics for the webhook service.
//!
//! Each [`ServiceMetrics`] owns its own registry so that several routers can
//! live in one process (tests build one per case).

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // Webhook processing metrics
    pub webhook_requests_total: IntCounter,
    pub webhook_outcomes_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub webhook_errors_total: IntCounter,
    pub signature_validation_failures: IntCounter,

    // Review job metrics
    pub review_jobs_dispatched_total: IntCounter,
    pub review_jobs_failed_total: IntCounter,
    pub review_jobs_in_flight: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total = IntCounter::new(
            "webhook_requests_total",
            "Total webhook requests received",
        )?;
        let webhook_outcomes_total = IntCounterVec::new(
            Opts::new(
                "webhook_outcomes_total",
                "Webhook requests by pipeline outcome",
            ),
            &["outcome"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;
        let webhook_errors_total = IntCounter::new(
            "webhook_errors_total",
            "Webhook requests that failed with an internal error",
        )?;
        let signature_validation_failures = IntCounter::new(
            "signature_validation_failures",
            "Webhook requests with a missing or invalid signature",
        )?;
        let review_jobs_dispatched_total = IntCounter::new(
            "review_jobs_dispatched_total",
            "Review jobs handed to the dispatcher",
        )?;
        let review_jobs_failed_total = IntCounter::new(
            "review_jobs_failed_total",
            "Review jobs that failed after the response was sent",
        )?;
        let review_jobs_in_flight = IntGauge::new(
            "review_jobs_in_flight",
            "Review jobs currently running",
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_outcomes_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(webhook_errors_total.clone()))?;
        registry.register(Box::new(signature_validation_failures.clone()))?;
        registry.register(Box::new(review_jobs_dispatched_total.clone()))?;
        registry.register(Box::new(review_jobs_failed_total.clone()))?;
        registry.register(Box::new(review_jobs_in_flight.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_outcomes_total,
            webhook_duration_seconds,
            webhook_errors_total,
            signature_validation_failures,
            review_jobs_dispatched_total,
            review_jobs_failed_total,
            review_jobs_in_flight,
        }))
    }

    /// Record one webhook request that reached a pipeline outcome.
    pub fn record_outcome(&self, outcome: &str, elapsed: Duration) {
        self.webhook_requests_total.inc();
        self.webhook_outcomes_total
            .with_label_values(&[outcome])
            .inc();
        self.webhook_duration_seconds.observe(elapsed.as_secs_f64());
        match outcome {
            "invalid_signature" => self.signature_validation_failures.inc(),
            "accepted" => self.review_jobs_dispatched_total.inc(),
            _ => {}
        }
    }

    /// Record one webhook request that ended in an internal error.
    pub fn record_error(&self, elapsed: Duration) {
        self.webhook_requests_total.inc();
        self.webhook_errors_total.inc();
        self.webhook_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
