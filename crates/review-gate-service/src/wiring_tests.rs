//! Tests for collaborator wiring.

use super::*;
use review_gate_api::config::SecretString;
use tempfile::TempDir;

fn config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretString::new("webhook-secret");
    config.review.endpoint_url = Some("http://127.0.0.1:9/reviews".to_string());
    config
}

/// Verify the debug directory is created when configured
#[tokio::test]
async fn test_debug_directory_created() {
    let dir = TempDir::new().unwrap();
    let debug_dir = dir.path().join("debug");
    let mut config = config();
    config.debug.directory = Some(debug_dir.clone());

    build_components(&config).await.unwrap();

    assert!(debug_dir.is_dir());
}

#[tokio::test]
async fn test_components_without_debug_directory() {
    assert!(build_components(&config()).await.is_ok());
}

/// Verify a missing review endpoint fails wiring
#[tokio::test]
async fn test_missing_review_endpoint_fails() {
    let mut config = config();
    config.review.endpoint_url = None;

    let err = build_components(&config).await.err().unwrap();

    assert!(err.to_string().contains("review.endpoint_url"));
}
