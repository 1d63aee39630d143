//! Integration tests for reviews requested through `@bot` comments

mod common;

use axum::http::StatusCode;
use common::{body_json, pr_comment_payload, signed_request, TestApp, INSTALLATION_ID};
use review_gate_core::{ReviewScope, TriggerMode};
use serde_json::json;
use tower::ServiceExt;

/// Verify a scoped mention fetches the PR and dispatches one mention job
#[tokio::test]
async fn test_scoped_review_mention_dispatched() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-1",
            &pr_comment_payload(
                "octocat/hello-world",
                31,
                "Could you take a look? @argus-ai-assistant review security",
            ),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Review processing started");
    assert_eq!(body["deliveryId"], "mention-1");

    assert_eq!(
        app.fetcher.calls(),
        vec![("octocat/hello-world".to_string(), 31, INSTALLATION_ID)]
    );

    app.wait_for_jobs().await;
    let jobs = app.processor.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].request.trigger, TriggerMode::Mention);
    assert_eq!(jobs[0].request.scope, Some(ReviewScope::Security));
    assert_eq!(jobs[0].request.pr_number(), 31);
    assert_eq!(jobs[0].event_type, "issue_comment");
}

/// Verify an unscoped mention defaults to a full review
#[tokio::test]
async fn test_unscoped_mention_is_full_review() {
    let app = TestApp::new();

    app.router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-2",
            &pr_comment_payload("octocat/hello-world", 31, "@Argus-AI-Assistant REVIEW please"),
        ))
        .await
        .unwrap();

    app.wait_for_jobs().await;
    let jobs = app.processor.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].request.effective_scope(), ReviewScope::Full);
}

/// Verify skip is acknowledged and never dispatched
#[tokio::test]
async fn test_skip_acknowledged_without_dispatch() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-3",
            &pr_comment_payload("octocat/hello-world", 31, "@argus-ai-assistant skip"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Skip command acknowledged"
    );
    assert!(app.fetcher.calls().is_empty());
    app.wait_for_jobs().await;
    assert!(app.processor.jobs().is_empty());
}

/// Verify comments without a mention are ignored
#[tokio::test]
async fn test_comment_without_mention_ignored() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-4",
            &pr_comment_payload("octocat/hello-world", 31, "LGTM, ship it"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "No bot mention found"
    );
}

/// Verify comments on plain issues are ignored
#[tokio::test]
async fn test_comment_on_issue_ignored() {
    let app = TestApp::new();
    let mut payload = pr_comment_payload("octocat/hello-world", 31, "@argus-ai-assistant review");
    payload["issue"] = json!({ "number": 31 });

    let response = app
        .router
        .clone()
        .oneshot(signed_request("issue_comment", "mention-5", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Comment ignored");
    assert!(app.fetcher.calls().is_empty());
}

/// Verify a mention on a draft PR is ignored after the lookup
#[tokio::test]
async fn test_mention_on_draft_ignored() {
    let app = TestApp::new();
    app.fetcher.set_draft(true);

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-6",
            &pr_comment_payload("octocat/hello-world", 31, "@argus-ai-assistant review"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Draft PR ignored");
    assert_eq!(app.fetcher.calls().len(), 1);
    app.wait_for_jobs().await;
    assert!(app.processor.jobs().is_empty());
}

/// Verify a failed PR lookup surfaces as 500 without dispatch
#[tokio::test]
async fn test_fetch_failure_is_server_error() {
    let app = TestApp::new();
    app.fetcher.set_failing(true);

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-7",
            &pr_comment_payload("octocat/hello-world", 31, "@argus-ai-assistant review"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Failed to fetch pull request" })
    );
    assert_eq!(app.store.dedup_entries(), 0);
    app.wait_for_jobs().await;
    assert!(app.processor.jobs().is_empty());
}

/// Verify a custom mention handle replaces the identity in comments
#[tokio::test]
async fn test_custom_mention_handle() {
    let mut config = common::test_config();
    config.webhooks.mention_handle = Some("argus".to_string());
    let app = TestApp::with_config(config);

    let response = app
        .router
        .clone()
        .oneshot(signed_request(
            "issue_comment",
            "mention-8",
            &pr_comment_payload("octocat/hello-world", 31, "@argus review style"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    app.wait_for_jobs().await;
    let jobs = app.processor.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].request.scope, Some(ReviewScope::Style));
}
