//! Repository allow-list gate.

use async_trait::async_trait;

/// Decides whether reviews may run for a repository.
#[async_trait]
pub trait RepositoryAllowList: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AllowListError`] when the backing list cannot be consulted.
    async fn is_allowed(&self, owner: &str, repo: &str) -> Result<bool, AllowListError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AllowListError {
    #[error("Invalid allow-list pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Allow-list unavailable: {message}")]
    Unavailable { message: String },
}

// ============================================================================
// StaticAllowList
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Repository { owner: String, repo: String },
    Owner { owner: String },
}

/// Allow-list built from configuration.
///
/// Entries are `owner/repo` or `owner/*` and match case-insensitively. An
/// empty list denies everything unless `allow_all` is set.
///
/// # Examples
///
/// ```rust
/// use review_gate_core::allow_list::StaticAllowList;
///
/// let list = StaticAllowList::new(false, ["octocat/hello-world", "rust-lang/*"]).unwrap();
/// assert!(list.contains("OctoCat", "Hello-World"));
/// assert!(list.contains("rust-lang", "cargo"));
/// assert!(!list.contains("octocat", "spoon-knife"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticAllowList {
    allow_all: bool,
    patterns: Vec<Pattern>,
}

impl StaticAllowList {
    /// # Errors
    ///
    /// Returns [`AllowListError::InvalidPattern`] for entries that are not
    /// `owner/repo` or `owner/*`.
    pub fn new<I, S>(allow_all: bool, entries: I) -> Result<Self, AllowListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = entries
            .into_iter()
            .map(|entry| parse_pattern(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allow_all,
            patterns,
        })
    }

    /// Allow-list that admits every repository.
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            patterns: Vec::new(),
        }
    }

    pub fn contains(&self, owner: &str, repo: &str) -> bool {
        if self.allow_all {
            return true;
        }

        self.patterns.iter().any(|pattern| match pattern {
            Pattern::Repository {
                owner: o,
                repo: r,
            } => o.eq_ignore_ascii_case(owner) && r.eq_ignore_ascii_case(repo),
            Pattern::Owner { owner: o } => o.eq_ignore_ascii_case(owner),
        })
    }
}

#[async_trait]
impl RepositoryAllowList for StaticAllowList {
    async fn is_allowed(&self, owner: &str, repo: &str) -> Result<bool, AllowListError> {
        Ok(self.contains(owner, repo))
    }
}

/// Validate a single `owner/repo` or `owner/*` entry.
fn parse_pattern(entry: &str) -> Result<Pattern, AllowListError> {
    let invalid = |message: &str| AllowListError::InvalidPattern {
        pattern: entry.to_string(),
        message: message.to_string(),
    };

    let (owner, repo) = entry
        .trim()
        .split_once('/')
        .ok_or_else(|| invalid("expected 'owner/repo' or 'owner/*'"))?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid("expected 'owner/repo' or 'owner/*'"));
    }
    if owner == "*" || (repo != "*" && repo.contains('*')) {
        return Err(invalid("only the repository segment may be a '*' wildcard"));
    }

    Ok(if repo == "*" {
        Pattern::Owner {
            owner: owner.to_string(),
        }
    } else {
        Pattern::Repository {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    })
}

#[cfg(test)]
#[path = "allow_list_tests.rs"]
mod tests;
