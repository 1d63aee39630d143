//! Common test utilities for review-gate integration tests
//!
//! This module provides:
//! - Recording doubles for the pull request fetcher, review processor and debug sink
//! - A builder that assembles the real router around those doubles
//! - Payload builders and signed request helpers

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use review_gate_api::config::SecretString;
use review_gate_api::{
    build_coordinator, create_router, AppState, PipelineComponents, ServiceConfig, ServiceMetrics,
};
use review_gate_core::{
    DebugErrorRecord, DebugSink, DebugSinkError, DebugSnapshot, DispatchJob, FetchError,
    HmacSignatureVerifier, InMemoryStore, InstallationId, PullRequestData, PullRequestFetcher,
    RepositoryName, ReviewError, ReviewProcessor, WebhookSecret,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET: &str = "integration-secret";
pub const BOT_LOGIN: &str = "argus-ai-assistant[bot]";
pub const INSTALLATION_ID: u64 = 4242;

// ============================================================================
// Mock Pull Request Fetcher
// ============================================================================

/// Fetcher returning a fixed pull request, or failing, and recording calls
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockFetcher {
    calls: Arc<Mutex<Vec<(String, u64, u64)>>>,
    draft: Arc<Mutex<bool>>,
    fail: Arc<Mutex<bool>>,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn set_draft(&self, draft: bool) {
        *self.draft.lock().unwrap() = draft;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<(String, u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PullRequestFetcher for MockFetcher {
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: u64,
        installation: InstallationId,
    ) -> Result<PullRequestData, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((repository.full_name(), number, installation.as_u64()));

        if *self.fail.lock().unwrap() {
            return Err(FetchError::UpstreamStatus {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }

        let draft = *self.draft.lock().unwrap();
        Ok(serde_json::from_value(json!({
            "number": number,
            "title": "Fetched pull request",
            "draft": draft,
            "state": "open",
            "head": { "ref": "feature", "sha": "abc123" },
            "base": { "ref": "main", "sha": "def456" }
        }))
        .unwrap())
    }
}

// ============================================================================
// Mock Review Processor
// ============================================================================

/// Processor recording every job, optionally failing or slow
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockProcessor {
    jobs: Arc<Mutex<Vec<DispatchJob>>>,
    fail: Arc<Mutex<bool>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

#[allow(dead_code)]
impl MockProcessor {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn jobs(&self) -> Vec<DispatchJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReviewProcessor for MockProcessor {
    async fn process(&self, job: &DispatchJob) -> Result<(), ReviewError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.jobs.lock().unwrap().push(job.clone());

        if *self.fail.lock().unwrap() {
            return Err(ReviewError::Permanent {
                message: "review backend rejected the job".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Recording Debug Sink
// ============================================================================

#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingSink {
    snapshots: Arc<Mutex<Vec<DebugSnapshot>>>,
    errors: Arc<Mutex<Vec<DebugErrorRecord>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn snapshots(&self) -> Vec<DebugSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<DebugErrorRecord> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DebugSink for RecordingSink {
    async fn persist_snapshot(&self, snapshot: &DebugSnapshot) -> Result<(), DebugSinkError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn persist_error(&self, record: &DebugErrorRecord) -> Result<(), DebugSinkError> {
        self.errors.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ============================================================================
// Test Application
// ============================================================================

/// Router plus handles on every double behind it
#[allow(dead_code)]
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub fetcher: MockFetcher,
    pub processor: MockProcessor,
    pub sink: RecordingSink,
    pub store: Arc<InMemoryStore>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let fetcher = MockFetcher::default();
        let processor = MockProcessor::default();
        let sink = RecordingSink::default();
        let store = Arc::new(InMemoryStore::new());
        let metrics = ServiceMetrics::new().unwrap();

        let coordinator = build_coordinator(
            &config,
            PipelineComponents {
                fetcher: Arc::new(fetcher.clone()),
                processor: Arc::new(processor.clone()),
                debug_sink: Arc::new(sink.clone()),
                dedup_store: store.clone(),
                rate_limit_store: store.clone(),
            },
            metrics.clone(),
        )
        .unwrap();

        let state = AppState::new(config, Arc::new(coordinator), metrics);
        let router = create_router(state.clone());

        Self {
            state,
            router,
            fetcher,
            processor,
            sink,
            store,
        }
    }

    /// Wait until every dispatched review job has finished.
    pub async fn wait_for_jobs(&self) {
        self.state.coordinator.dispatcher().wait_idle().await;
    }

    pub fn rate_limit_usage(&self) -> u32 {
        self.store
            .window_usage(&format!("ratelimit:installation:{}", INSTALLATION_ID))
    }
}

/// Configuration admitting every repository, signed with [`SECRET`]
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretString::new(SECRET);
    config.allow_list.allow_all = true;
    config.review.endpoint_url = Some("http://localhost:9000/reviews".to_string());
    config
}

// ============================================================================
// Requests and Payloads
// ============================================================================

pub fn sign(body: &[u8]) -> String {
    HmacSignatureVerifier::new(WebhookSecret::new(SECRET)).sign(body)
}

/// Signed webhook POST to `/webhook`
#[allow(dead_code)]
pub fn signed_request(event: &str, delivery: &str, payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = sign(&body);
    webhook_request(event, Some(delivery), Some(&signature), body)
}

/// Webhook POST with full control over the optional headers
#[allow(dead_code)]
pub fn webhook_request(
    event: &str,
    delivery: Option<&str>,
    signature: Option<&str>,
    body: Vec<u8>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event);
    if let Some(delivery) = delivery {
        builder = builder.header("X-GitHub-Delivery", delivery);
    }
    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `pull_request` / `review_requested` naming the bot as reviewer
#[allow(dead_code)]
pub fn review_requested_payload(repository: &str, number: u64, draft: bool) -> Value {
    json!({
        "action": "review_requested",
        "number": number,
        "pull_request": {
            "number": number,
            "title": "Improve caching",
            "draft": draft,
            "state": "open",
            "html_url": format!("https://github.com/{}/pull/{}", repository, number),
            "user": { "login": "octocat", "type": "User" },
            "head": { "ref": "feature", "sha": "abc123" },
            "base": { "ref": "main", "sha": "def456" }
        },
        "requested_reviewer": { "login": BOT_LOGIN, "type": "Bot" },
        "repository": { "full_name": repository },
        "installation": { "id": INSTALLATION_ID }
    })
}

/// `issue_comment` / `created` on a pull request
#[allow(dead_code)]
pub fn pr_comment_payload(repository: &str, number: u64, comment: &str) -> Value {
    json!({
        "action": "created",
        "issue": {
            "number": number,
            "pull_request": { "url": format!("https://api.github.com/repos/{}/pulls/{}", repository, number) }
        },
        "comment": {
            "body": comment,
            "user": { "login": "octocat", "type": "User" }
        },
        "repository": { "full_name": repository },
        "installation": { "id": INSTALLATION_ID }
    })
}
