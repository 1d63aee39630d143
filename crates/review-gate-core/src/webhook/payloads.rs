//! Narrow serde views of the GitHub webhook payloads the pipeline reads.
//!
//! Only the fields the classifier needs are modelled; everything else in the
//! payload is ignored. The full JSON is kept separately for debug snapshots.

use crate::review::PullRequestData;
use crate::InstallationId;
use serde::{Deserialize, Serialize};

/// Kind of GitHub account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActorType {
    User,
    Bot,
    Organization,
    #[default]
    #[serde(other)]
    Unknown,
}

/// GitHub account reference (user, bot or organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    #[serde(rename = "type", default)]
    pub actor_type: ActorType,
}

impl Actor {
    pub fn is_bot(&self) -> bool {
        self.actor_type == ActorType::Bot
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InstallationRef {
    pub id: InstallationId,
}

/// `pull_request` event body.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: PullRequestData,
    pub repository: RepositoryRef,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
    /// Present on `review_requested` when a single account was requested.
    #[serde(default)]
    pub requested_reviewer: Option<Actor>,
}

/// `pull_request_review` event body.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewPayload {
    #[serde(default)]
    pub action: String,
    pub pull_request: PullRequestData,
    pub repository: RepositoryRef,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

/// `issue_comment` event body.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: IssueRef,
    #[serde(default)]
    pub comment: Option<CommentRef>,
    pub repository: RepositoryRef,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    /// Set only when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueRef {
    pub fn is_pull_request(&self) -> bool {
        matches!(&self.pull_request, Some(value) if !value.is_null())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRef {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<Actor>,
}

/// Installation id of an optional installation reference, `0` when absent.
pub(crate) fn installation_id(installation: Option<InstallationRef>) -> InstallationId {
    installation
        .map(|i| i.id)
        .unwrap_or(InstallationId::UNKNOWN)
}
