//! Tests for graceful shutdown and job draining.

use super::*;
use crate::test_support::{build_state, review_requested, sign, test_config, RecordingProcessor};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;

async fn post_review_request(address: SocketAddr, delivery: &str) -> u16 {
    let body = serde_json::to_vec(&review_requested("octocat/hello-world", 11)).unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/webhook", address))
        .header("content-type", "application/json")
        .header("X-GitHub-Event", "pull_request")
        .header("X-GitHub-Delivery", delivery)
        .header("X-Hub-Signature-256", sign(&body))
        .body(body)
        .send()
        .await
        .unwrap();

    response.status().as_u16()
}

/// Verify running review jobs finish before the server returns
#[tokio::test]
async fn test_shutdown_drains_running_jobs() {
    let processor = Arc::new(RecordingProcessor {
        delay: Some(Duration::from_millis(200)),
        ..Default::default()
    });
    let state = build_state(test_config(), processor.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async {
        let _ = shutdown_rx.await;
    }));

    assert_eq!(post_review_request(address, "drain-1").await, 200);
    assert!(processor.jobs().is_empty());

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(processor.jobs().len(), 1);
}

/// Verify jobs exceeding the shutdown timeout are abandoned
#[tokio::test]
async fn test_shutdown_timeout_bounds_drain() {
    let processor = Arc::new(RecordingProcessor {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let mut config = test_config();
    config.server.shutdown_timeout_seconds = 0;
    let state = build_state(config, processor.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async {
        let _ = shutdown_rx.await;
    }));

    assert_eq!(post_review_request(address, "drain-2").await, 200);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server).await;

    assert!(result.is_ok(), "server did not stop within the shutdown timeout");
    assert!(processor.jobs().is_empty());
}
