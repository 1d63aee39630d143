//! Tests for review request types.

use super::*;
use serde_json::json;

fn repo() -> RepositoryName {
    RepositoryName::parse("octocat/hello-world").unwrap()
}

fn pr(number: u64, draft: bool) -> PullRequestData {
    serde_json::from_value(json!({ "number": number, "draft": draft })).unwrap()
}

#[test]
fn test_scope_parses_case_insensitively() {
    assert_eq!("SECURITY".parse::<ReviewScope>().unwrap(), ReviewScope::Security);
    assert_eq!("style".parse::<ReviewScope>().unwrap(), ReviewScope::Style);
    assert!("everything".parse::<ReviewScope>().is_err());
}

#[test]
fn test_trigger_mode_serializes_kebab_case() {
    assert_eq!(
        serde_json::to_value(TriggerMode::DirectRequest).unwrap(),
        json!("direct-request")
    );
    assert_eq!(serde_json::to_value(TriggerMode::Mention).unwrap(), json!("mention"));
}

#[test]
fn test_pull_request_data_tolerates_missing_optional_fields() {
    let data = pr(7, false);

    assert_eq!(data.number, 7);
    assert!(data.title.is_empty());
    assert!(data.head.is_none());
}

#[test]
fn test_pull_request_data_reads_rest_shape() {
    let data: PullRequestData = serde_json::from_value(json!({
        "number": 42,
        "title": "Add feature",
        "draft": true,
        "state": "open",
        "html_url": "https://github.com/octocat/hello-world/pull/42",
        "user": { "login": "octocat", "type": "User" },
        "head": { "ref": "feature", "sha": "abc123", "repo": {} },
        "base": { "ref": "main", "sha": "def456" },
        "mergeable": null
    }))
    .unwrap();

    assert!(data.draft);
    assert_eq!(data.head.unwrap().ref_name, "feature");
    assert_eq!(data.user.unwrap().login, "octocat");
}

#[test]
fn test_mention_request_carries_scope_and_trigger() {
    let request =
        NormalizedReviewRequest::from_mention(repo(), pr(5, false), InstallationId::new(9), ReviewScope::Security);

    assert_eq!(request.trigger, TriggerMode::Mention);
    assert_eq!(request.scope, Some(ReviewScope::Security));
    assert_eq!(request.effective_scope(), ReviewScope::Security);
    assert!(request.requested_reviewer.is_none());
    assert_eq!(request.pr_number(), 5);
}

#[test]
fn test_direct_request_defaults_to_full_scope() {
    let request = NormalizedReviewRequest::direct(repo(), pr(5, true), InstallationId::UNKNOWN, None);

    assert_eq!(request.trigger, TriggerMode::DirectRequest);
    assert_eq!(request.effective_scope(), ReviewScope::Full);
    assert!(request.is_draft());
}

#[test]
fn test_dispatch_job_json_shape() {
    let request =
        NormalizedReviewRequest::from_mention(repo(), pr(5, false), InstallationId::new(9), ReviewScope::Style);
    let job = DispatchJob::new(DeliveryId::new("d-1"), "issue_comment".to_string(), request);

    let value = serde_json::to_value(&job).unwrap();

    assert_eq!(value["delivery_id"], json!("d-1"));
    assert_eq!(value["request"]["trigger"], json!("mention"));
    assert_eq!(value["request"]["scope"], json!("style"));
    assert_eq!(value["request"]["installation_id"], json!(9));
    assert_eq!(value["request"]["repository"]["owner"], json!("octocat"));
}
