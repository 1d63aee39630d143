//! Shared fixtures for the API unit tests.

use crate::config::{SecretString, ServiceConfig};
use crate::metrics::ServiceMetrics;
use crate::pipeline::{build_coordinator, PipelineComponents};
use crate::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use review_gate_core::{
    DispatchJob, FetchError, HmacSignatureVerifier, InMemoryStore, InstallationId,
    LoggingDebugSink, PullRequestData, PullRequestFetcher, RepositoryName, ReviewError,
    ReviewProcessor, WebhookSecret,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const SECRET: &str = "webhook-secret";
pub(crate) const BOT_LOGIN: &str = "argus-ai-assistant[bot]";

pub(crate) struct StubFetcher {
    pub draft: bool,
}

#[async_trait]
impl PullRequestFetcher for StubFetcher {
    async fn fetch_pull_request(
        &self,
        _repository: &RepositoryName,
        number: u64,
        _installation: InstallationId,
    ) -> Result<PullRequestData, FetchError> {
        serde_json::from_value(json!({ "number": number, "draft": self.draft })).map_err(|e| {
            FetchError::InvalidResponse {
                message: e.to_string(),
            }
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingProcessor {
    pub jobs: Mutex<Vec<DispatchJob>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingProcessor {
    pub fn jobs(&self) -> Vec<DispatchJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewProcessor for RecordingProcessor {
    async fn process(&self, job: &DispatchJob) -> Result<(), ReviewError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail {
            return Err(ReviewError::Permanent {
                message: "review backend rejected job".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretString::new(SECRET);
    config.allow_list.allow_all = true;
    config.review.endpoint_url = Some("http://localhost:9000/reviews".to_string());
    config
}

pub(crate) fn build_state(config: ServiceConfig, processor: Arc<RecordingProcessor>) -> AppState {
    let metrics = ServiceMetrics::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(
        &config,
        PipelineComponents {
            fetcher: Arc::new(StubFetcher { draft: false }),
            processor,
            debug_sink: Arc::new(LoggingDebugSink),
            dedup_store: store.clone(),
            rate_limit_store: store,
        },
        metrics.clone(),
    )
    .unwrap();

    AppState::new(config, Arc::new(coordinator), metrics)
}

pub(crate) fn sign(body: &[u8]) -> String {
    HmacSignatureVerifier::new(WebhookSecret::new(SECRET)).sign(body)
}

pub(crate) fn review_requested(repository: &str, number: u64) -> Value {
    json!({
        "action": "review_requested",
        "pull_request": { "number": number, "draft": false, "title": "Add feature" },
        "repository": { "full_name": repository },
        "installation": { "id": 99 },
        "requested_reviewer": { "login": BOT_LOGIN, "type": "Bot" }
    })
}

/// Signed POST to `/webhook`.
pub(crate) fn webhook_request(event: &str, delivery: &str, payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", delivery)
        .header("X-Hub-Signature-256", sign(&body))
        .body(Body::from(body))
        .unwrap()
}
