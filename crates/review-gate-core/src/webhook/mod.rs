//! Webhook intake types: headers, deliveries, payload shapes, classification,
//! mention parsing and signature verification.

use crate::{DeliveryId, Timestamp};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

pub mod classifier;
pub mod mention;
pub mod payloads;
pub mod signature;

pub use classifier::{
    Classification, ClassificationError, EventClassifier, IgnoreReason, MentionTrigger,
    ReviewCandidate,
};
pub use mention::{MentionCommand, MentionParser};
pub use signature::{HmacSignatureVerifier, SignatureVerifier, WebhookSecret};

// ============================================================================
// Event Kinds
// ============================================================================

/// GitHub event type from the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    PullRequest,
    PullRequestReview,
    IssueComment,
    /// Any event the pipeline does not handle, including a missing header.
    Other(String),
}

impl EventKind {
    pub fn from_header(value: &str) -> Self {
        match value {
            "pull_request" => Self::PullRequest,
            "pull_request_review" => Self::PullRequestReview,
            "issue_comment" => Self::IssueComment,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::IssueComment => "issue_comment",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Headers and Deliveries
// ============================================================================

/// GitHub-specific HTTP headers used by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub event_type: String,          // X-GitHub-Event
    pub delivery_id: Option<String>, // X-GitHub-Delivery
    pub signature: Option<String>,   // X-Hub-Signature-256
}

impl WebhookHeaders {
    /// Extract the webhook headers from an HTTP header map.
    ///
    /// Header names are matched case-insensitively. Values are never rejected
    /// here, so an unsigned request always reaches signature verification. A
    /// missing or unrecognised event header classifies as out of scope; a
    /// missing or empty delivery id is left as `None` so a fresh one can be
    /// generated.
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        let lookup = |name: &str| -> Option<String> {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.trim().to_string())
        };

        let event_type = lookup("x-github-event").unwrap_or_default();
        let delivery_id = lookup("x-github-delivery").filter(|value| !value.is_empty());
        let signature = lookup("x-hub-signature-256").filter(|value| !value.is_empty());

        Self {
            event_type,
            delivery_id,
            signature,
        }
    }
}

/// One inbound webhook call. Created per request and never persisted as-is.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub kind: EventKind,
    pub delivery_id: DeliveryId,
    /// True when the sender supplied no delivery id and one was generated.
    pub delivery_id_generated: bool,
    pub signature: Option<String>,
    pub body: Bytes,
    pub received_at: Timestamp,
}

impl Delivery {
    pub fn new(headers: WebhookHeaders, body: Bytes) -> Self {
        let (delivery_id, delivery_id_generated) = match headers.delivery_id {
            Some(id) => (DeliveryId::new(id), false),
            None => (DeliveryId::generate(), true),
        };

        Self {
            kind: EventKind::from_header(&headers.event_type),
            delivery_id,
            delivery_id_generated,
            signature: headers.signature,
            body,
            received_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
