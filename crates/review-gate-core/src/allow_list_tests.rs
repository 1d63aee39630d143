//! Tests for [`StaticAllowList`].

use super::*;

#[tokio::test]
async fn test_exact_repository_match_is_case_insensitive() {
    let list = StaticAllowList::new(false, ["Octocat/Hello-World"]).unwrap();

    assert!(list.is_allowed("octocat", "hello-world").await.unwrap());
    assert!(!list.is_allowed("octocat", "other").await.unwrap());
}

#[tokio::test]
async fn test_owner_wildcard_matches_every_repository() {
    let list = StaticAllowList::new(false, ["octocat/*"]).unwrap();

    assert!(list.is_allowed("octocat", "anything").await.unwrap());
    assert!(!list.is_allowed("someone", "anything").await.unwrap());
}

#[tokio::test]
async fn test_empty_list_denies_everything() {
    let list = StaticAllowList::new(false, Vec::<String>::new()).unwrap();

    assert!(!list.is_allowed("octocat", "hello-world").await.unwrap());
}

#[tokio::test]
async fn test_allow_all_ignores_patterns() {
    let list = StaticAllowList::new(true, ["octocat/only"]).unwrap();

    assert!(list.is_allowed("anyone", "anything").await.unwrap());
    assert!(StaticAllowList::allow_all().contains("a", "b"));
}

#[test]
fn test_invalid_patterns_rejected() {
    for entry in ["", "octocat", "/repo", "owner/", "a/b/c", "*/repo", "owner/re*"] {
        assert!(
            matches!(
                StaticAllowList::new(false, [entry]),
                Err(AllowListError::InvalidPattern { .. })
            ),
            "'{}' should be rejected",
            entry
        );
    }
}
