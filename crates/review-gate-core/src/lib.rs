//! # Review Gate Core
//!
//! Core business logic for the Review Gate webhook ingestion service.
//!
//! This crate decides which GitHub webhook deliveries should start an automated
//! code review: it verifies signatures, classifies events, parses bot mentions,
//! applies the allow-list, deduplication and rate-limit gates, and hands accepted
//! requests to an asynchronous dispatcher.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions
//! - Storage, GitHub access, review execution and debug persistence are injected
//! - In-process and filesystem implementations live in [`adapters`]
//!
//! ## Usage
//!
//! ```rust
//! use review_gate_core::{DeliveryId, InstallationId, RepositoryName};
//!
//! let repository = RepositoryName::parse("octocat/hello-world").unwrap();
//! assert_eq!(repository.owner(), "octocat");
//!
//! let delivery = DeliveryId::generate();
//! assert!(!delivery.as_str().is_empty());
//!
//! assert!(InstallationId::default().is_unknown());
//! ```

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use ulid::Ulid;
pub use uuid::Uuid;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Identifier of a single webhook delivery (`X-GitHub-Delivery`).
///
/// GitHub sends a UUID, but any non-empty string is accepted as-is. When the
/// header is missing a random UUID v4 is generated instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(String);

impl DeliveryId {
    /// Wrap an existing delivery identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random delivery identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GitHub App installation identifier, the subject of rate limiting.
///
/// `0` is the sentinel for deliveries that carry no installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Sentinel used when a delivery has no installation.
    pub const UNKNOWN: InstallationId = InstallationId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository owner and name, derived from a `owner/name` full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    /// Split a repository full name into owner and name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`] unless the value splits on `/`
    /// into exactly two non-empty segments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use review_gate_core::RepositoryName;
    ///
    /// assert!(RepositoryName::parse("octocat/hello-world").is_ok());
    /// assert!(RepositoryName::parse("octocat").is_err());
    /// assert!(RepositoryName::parse("octocat/").is_err());
    /// assert!(RepositoryName::parse("a/b/c").is_err());
    /// ```
    pub fn parse(full_name: &str) -> Result<Self, ValidationError> {
        let mut segments = full_name.split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ValidationError::InvalidFormat {
                field: "repository.full_name".to_string(),
                message: format!("expected 'owner/name', got '{}'", full_name),
            }),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ============================================================================
// Time
// ============================================================================

/// UTC timestamp wrapper used on every record the service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Milliseconds elapsed since this timestamp, saturating at zero.
    pub fn elapsed_millis(&self) -> u64 {
        (Utc::now() - self.0).num_milliseconds().max(0) as u64
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Shared Errors
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Failure reported by a deduplication or rate-limit store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store operation failed: {operation}: {message}")]
    OperationFailed { operation: String, message: String },
}

// ============================================================================
// Modules
// ============================================================================

pub mod adapters;
pub mod allow_list;
pub mod coordinator;
pub mod debug_sink;
pub mod dedup;
pub mod dispatcher;
pub mod github;
pub mod rate_limit;
pub mod retry;
pub mod review;
pub mod webhook;

pub use adapters::{FilesystemDebugSink, HttpReviewForwarder, InMemoryStore};
pub use allow_list::{AllowListError, RepositoryAllowList, StaticAllowList};
pub use coordinator::{CoordinatorParts, IngestionCoordinator, IngestionError, IngestionOutcome};
pub use debug_sink::{DebugErrorRecord, DebugSink, DebugSinkError, DebugSnapshot, LoggingDebugSink};
pub use dedup::{DedupKey, DeduplicationStore, IdempotencyGate};
pub use dispatcher::{Dispatcher, ReviewError, ReviewProcessor};
pub use github::{FetchError, GithubRestClient, GithubRestConfig, PullRequestFetcher};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitStore, RateLimiter};
pub use retry::{RetryPolicy, RetryState, RetryingReviewProcessor};
pub use review::{DispatchJob, NormalizedReviewRequest, PullRequestData, ReviewScope, TriggerMode};
pub use webhook::{
    Delivery, EventKind, HmacSignatureVerifier, MentionCommand, MentionParser, SignatureVerifier,
    WebhookHeaders, WebhookSecret,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
