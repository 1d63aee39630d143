//! Event classification: decides whether a verified delivery is in scope and,
//! if so, turns it into a review candidate.
//!
//! Checks run cheapest first. The event type is inspected before the body is
//! parsed, and the action and reviewer checks run before any comment text is
//! scanned for a mention.

use super::mention::{MentionCommand, MentionParser};
use super::payloads::{
    installation_id, Actor, IssueCommentPayload, PullRequestPayload, PullRequestReviewPayload,
};
use super::EventKind;
use crate::review::{NormalizedReviewRequest, ReviewScope};
use crate::{InstallationId, RepositoryName};
use serde::de::DeserializeOwned;
use tracing::debug;

// ============================================================================
// Classification Results
// ============================================================================

/// Why an in-scope-looking delivery was dropped with a 200 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event type is not one of the handled types.
    EventType,
    /// `pull_request` action other than `review_requested`.
    Action,
    /// Review was requested from someone other than the bot.
    ReviewerMismatch,
    /// Comment was not newly created or not on a pull request.
    Comment,
    /// Comment does not address the bot with a command.
    NoMention,
    /// Pull request is a draft.
    Draft,
}

impl IgnoreReason {
    /// Response message returned to the webhook sender.
    pub fn message(&self) -> &'static str {
        match self {
            Self::EventType => "Event ignored",
            Self::Action => "Action ignored - waiting for review request",
            Self::ReviewerMismatch => "Review request not for this bot",
            Self::Comment => "Comment ignored",
            Self::NoMention => "No bot mention found",
            Self::Draft => "Draft PR ignored",
        }
    }

    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventType => "event_type",
            Self::Action => "action",
            Self::ReviewerMismatch => "reviewer_mismatch",
            Self::Comment => "comment",
            Self::NoMention => "no_mention",
            Self::Draft => "draft",
        }
    }
}

/// A comment asked for a review; the pull request still has to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionTrigger {
    pub repository: RepositoryName,
    pub pr_number: u64,
    pub installation_id: InstallationId,
    pub scope: ReviewScope,
    pub commenter: Option<String>,
}

/// An in-scope delivery that continues down the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCandidate {
    /// Already carries the full pull request.
    Direct(NormalizedReviewRequest),
    /// Needs a pull request fetch before it becomes a normalized request.
    Mention(MentionTrigger),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignored(IgnoreReason),
    /// Repository full name did not split into `owner/name`.
    InvalidRepository { full_name: String },
    /// `skip` command; acknowledged without dispatch.
    SkipAcknowledged {
        repository: RepositoryName,
        pr_number: u64,
    },
    Candidate(ReviewCandidate),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("Malformed {event_type} payload: {message}")]
    MalformedPayload { event_type: String, message: String },
}

// ============================================================================
// EventClassifier
// ============================================================================

/// Stateless classifier configured with the bot identity and mention handle.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    bot_identity: String,
    mention_parser: MentionParser,
}

impl EventClassifier {
    /// # Arguments
    ///
    /// * `bot_identity` - Substring a requested reviewer's login must contain
    /// * `mention_parser` - Parser for the bot's comment commands
    pub fn new(bot_identity: impl Into<String>, mention_parser: MentionParser) -> Self {
        Self {
            bot_identity: bot_identity.into(),
            mention_parser,
        }
    }

    /// Classify a verified delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::MalformedPayload`] when the body of an
    /// in-scope event is not the JSON shape GitHub sends for it.
    pub fn classify(
        &self,
        kind: &EventKind,
        body: &[u8],
    ) -> Result<Classification, ClassificationError> {
        match kind {
            EventKind::Other(event_type) => {
                debug!(event_type = %event_type, "Event type not handled");
                Ok(Classification::Ignored(IgnoreReason::EventType))
            }
            EventKind::PullRequest => {
                let payload: PullRequestPayload = parse(kind, body)?;
                Ok(self.classify_pull_request(payload))
            }
            EventKind::PullRequestReview => {
                let payload: PullRequestReviewPayload = parse(kind, body)?;
                Ok(Self::classify_pull_request_review(payload))
            }
            EventKind::IssueComment => {
                let payload: IssueCommentPayload = parse(kind, body)?;
                Ok(self.classify_issue_comment(payload))
            }
        }
    }

    /// True when `reviewer` is a bot account whose login contains the bot identity.
    pub fn is_bot_reviewer(&self, reviewer: Option<&Actor>) -> bool {
        reviewer
            .map(|actor| actor.is_bot() && actor.login.contains(&self.bot_identity))
            .unwrap_or(false)
    }

    fn classify_pull_request(&self, payload: PullRequestPayload) -> Classification {
        if payload.action != "review_requested" {
            debug!(action = %payload.action, "Pull request action ignored");
            return Classification::Ignored(IgnoreReason::Action);
        }

        if !self.is_bot_reviewer(payload.requested_reviewer.as_ref()) {
            debug!(
                reviewer = payload.requested_reviewer.as_ref().map(|r| r.login.as_str()),
                "Review request not addressed to the bot"
            );
            return Classification::Ignored(IgnoreReason::ReviewerMismatch);
        }

        let repository = match RepositoryName::parse(&payload.repository.full_name) {
            Ok(repository) => repository,
            Err(_) => {
                return Classification::InvalidRepository {
                    full_name: payload.repository.full_name,
                }
            }
        };

        Classification::Candidate(ReviewCandidate::Direct(NormalizedReviewRequest::direct(
            repository,
            payload.pull_request,
            installation_id(payload.installation),
            payload.requested_reviewer,
        )))
    }

    fn classify_pull_request_review(payload: PullRequestReviewPayload) -> Classification {
        let repository = match RepositoryName::parse(&payload.repository.full_name) {
            Ok(repository) => repository,
            Err(_) => {
                return Classification::InvalidRepository {
                    full_name: payload.repository.full_name,
                }
            }
        };

        Classification::Candidate(ReviewCandidate::Direct(NormalizedReviewRequest::direct(
            repository,
            payload.pull_request,
            installation_id(payload.installation),
            None,
        )))
    }

    fn classify_issue_comment(&self, payload: IssueCommentPayload) -> Classification {
        let repository = match RepositoryName::parse(&payload.repository.full_name) {
            Ok(repository) => repository,
            Err(_) => {
                return Classification::InvalidRepository {
                    full_name: payload.repository.full_name,
                }
            }
        };

        if payload.action != "created" || !payload.issue.is_pull_request() {
            debug!(
                action = %payload.action,
                is_pull_request = payload.issue.is_pull_request(),
                "Comment ignored"
            );
            return Classification::Ignored(IgnoreReason::Comment);
        }

        let comment = payload.comment.unwrap_or_default();
        let body = comment.body.as_deref().unwrap_or("");

        match self.mention_parser.parse(body) {
            None => Classification::Ignored(IgnoreReason::NoMention),
            Some(MentionCommand::Skip) => Classification::SkipAcknowledged {
                repository,
                pr_number: payload.issue.number,
            },
            Some(MentionCommand::Review { scope }) => {
                Classification::Candidate(ReviewCandidate::Mention(MentionTrigger {
                    repository,
                    pr_number: payload.issue.number,
                    installation_id: installation_id(payload.installation),
                    scope,
                    commenter: comment.user.map(|u| u.login),
                }))
            }
        }
    }
}

fn parse<T: DeserializeOwned>(kind: &EventKind, body: &[u8]) -> Result<T, ClassificationError> {
    serde_json::from_slice(body).map_err(|e| ClassificationError::MalformedPayload {
        event_type: kind.as_str().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
