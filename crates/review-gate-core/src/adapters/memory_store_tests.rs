//! Tests for [`InMemoryStore`].

use super::*;
use crate::{DeliveryId, RepositoryName};
use std::sync::Arc;

fn key(delivery: &str) -> DedupKey {
    DedupKey::new(
        &RepositoryName::parse("octocat/hello-world").unwrap(),
        1,
        &DeliveryId::new(delivery),
    )
}

mod dedup_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_key_expires_after_retention() {
        let store = InMemoryStore::new();
        let retention = Duration::from_secs(60);

        assert!(store.record_if_absent(&key("a"), retention).await.unwrap());
        assert!(!store.record_if_absent(&key("a"), retention).await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(store.record_if_absent(&key("a"), retention).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_retention_never_expires() {
        let store = InMemoryStore::with_prune_threshold(0);
        let retention = Duration::from_secs(u64::MAX);

        assert!(store.record_if_absent(&key("a"), retention).await.unwrap());
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;

        assert!(!store.record_if_absent(&key("a"), retention).await.unwrap());
        assert_eq!(store.dedup_entries(), 1);
    }

    /// Concurrent duplicates: exactly one caller records the key.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_record_once() {
        let store = Arc::new(InMemoryStore::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .record_if_absent(&key("same"), Duration::from_secs(60))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut recorded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                recorded += 1;
            }
        }

        assert_eq!(recorded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_keys_are_pruned_past_threshold() {
        let store = InMemoryStore::with_prune_threshold(2);
        let retention = Duration::from_secs(1);

        for id in ["a", "b", "c"] {
            store.record_if_absent(&key(id), retention).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(2)).await;
        store.record_if_absent(&key("d"), retention).await.unwrap();

        assert_eq!(store.dedup_entries(), 1);
    }
}

mod rate_limit_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_budget_enforced_within_window() {
        let store = InMemoryStore::new();
        let window = Duration::from_secs(3600);

        for expected_used in 1..=3 {
            let decision = store.try_acquire("k", 3, window).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.used, expected_used);
        }

        let denied = store.try_acquire("k", 3, window).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.used, 3);
        assert_eq!(denied.resets_in, window);
        assert_eq!(store.window_usage("k"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let store = InMemoryStore::new();
        let window = Duration::from_secs(10);

        assert!(store.try_acquire("k", 1, window).await.unwrap().allowed);
        assert!(!store.try_acquire("k", 1, window).await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(store.try_acquire("k", 1, window).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_window_reports_remaining_time() {
        let store = InMemoryStore::with_prune_threshold(0);
        let window = Duration::MAX;

        assert!(store.try_acquire("k", 1, window).await.unwrap().allowed);
        tokio::time::advance(Duration::from_secs(5)).await;

        let denied = store.try_acquire("k", 1, window).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.resets_in, window - Duration::from_secs(5));
        assert_eq!(store.window_usage("k"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_always_denies() {
        let store = InMemoryStore::new();

        let decision = store
            .try_acquire("k", 0, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!decision.allowed);
        assert_eq!(decision.used, 0);
    }
}
