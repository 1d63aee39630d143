//! Normalized review requests and the jobs handed to the dispatcher.

use crate::webhook::payloads::Actor;
use crate::{DeliveryId, InstallationId, RepositoryName, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Scope and Trigger
// ============================================================================

/// Which aspects of the change the review should focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewScope {
    #[default]
    Full,
    Security,
    Performance,
    Style,
}

impl ReviewScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Style => "style",
        }
    }
}

impl fmt::Display for ReviewScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "security" => Ok(Self::Security),
            "performance" => Ok(Self::Performance),
            "style" => Ok(Self::Style),
            other => Err(ValidationError::InvalidFormat {
                field: "scope".to_string(),
                message: format!("unknown review scope '{}'", other),
            }),
        }
    }
}

/// How the review was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    /// The bot was added as a requested reviewer.
    DirectRequest,
    /// A comment addressed the bot with a review command.
    Mention,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectRequest => "direct-request",
            Self::Mention => "mention",
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Pull Request Data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Pull request fields shared by webhook payloads and the REST API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestData {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub user: Option<Actor>,
    #[serde(default)]
    pub head: Option<BranchRef>,
    #[serde(default)]
    pub base: Option<BranchRef>,
}

// ============================================================================
// Normalized Request
// ============================================================================

/// Canonical in-scope review trigger, regardless of which event produced it.
///
/// Exactly one exists per accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedReviewRequest {
    pub repository: RepositoryName,
    pub pull_request: PullRequestData,
    pub installation_id: InstallationId,
    pub requested_reviewer: Option<Actor>,
    pub trigger: TriggerMode,
    /// `None` for direct requests; mention requests always carry a scope.
    pub scope: Option<ReviewScope>,
}

impl NormalizedReviewRequest {
    /// Request produced by a reviewer assignment or review event.
    pub fn direct(
        repository: RepositoryName,
        pull_request: PullRequestData,
        installation_id: InstallationId,
        requested_reviewer: Option<Actor>,
    ) -> Self {
        Self {
            repository,
            pull_request,
            installation_id,
            requested_reviewer,
            trigger: TriggerMode::DirectRequest,
            scope: None,
        }
    }

    /// Request produced by a review mention once the pull request was fetched.
    pub fn from_mention(
        repository: RepositoryName,
        pull_request: PullRequestData,
        installation_id: InstallationId,
        scope: ReviewScope,
    ) -> Self {
        Self {
            repository,
            pull_request,
            installation_id,
            requested_reviewer: None,
            trigger: TriggerMode::Mention,
            scope: Some(scope),
        }
    }

    pub fn pr_number(&self) -> u64 {
        self.pull_request.number
    }

    pub fn is_draft(&self) -> bool {
        self.pull_request.draft
    }

    /// Scope the review should run with; direct requests review everything.
    pub fn effective_scope(&self) -> ReviewScope {
        self.scope.unwrap_or_default()
    }
}

// ============================================================================
// Dispatch Job
// ============================================================================

/// Unit of work handed to the review processor after a delivery is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchJob {
    pub delivery_id: DeliveryId,
    pub event_type: String,
    pub request: NormalizedReviewRequest,
    pub accepted_at: Timestamp,
}

impl DispatchJob {
    pub fn new(delivery_id: DeliveryId, event_type: String, request: NormalizedReviewRequest) -> Self {
        Self {
            delivery_id,
            event_type,
            request,
            accepted_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
