//! Bot mention parsing for comment-triggered reviews.

use crate::review::ReviewScope;
use crate::ValidationError;
use regex::Regex;

/// Command addressed to the bot in a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionCommand {
    Review { scope: ReviewScope },
    /// Acknowledged but otherwise a no-op.
    Skip,
}

/// Finds `@<handle> review|skip [security|performance|style]` in free text.
///
/// Matching is case-insensitive and only the first mention counts. The handle
/// must be followed by whitespace and a whole command word.
///
/// # Examples
///
/// ```rust
/// use review_gate_core::review::ReviewScope;
/// use review_gate_core::webhook::{MentionCommand, MentionParser};
///
/// let parser = MentionParser::new("argus-ai-assistant").unwrap();
/// assert_eq!(
///     parser.parse("@Argus-AI-Assistant REVIEW security please"),
///     Some(MentionCommand::Review { scope: ReviewScope::Security })
/// );
/// assert_eq!(parser.parse("thanks @argus-ai-assistant"), None);
/// ```
#[derive(Debug, Clone)]
pub struct MentionParser {
    pattern: Regex,
}

impl MentionParser {
    /// Build a parser for the given bot handle (with or without a leading `@`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the handle is empty or the resulting
    /// pattern cannot be compiled.
    pub fn new(handle: &str) -> Result<Self, ValidationError> {
        let handle = handle.trim().trim_start_matches('@');
        if handle.is_empty() {
            return Err(ValidationError::Required {
                field: "mention_handle".to_string(),
            });
        }

        let pattern = format!(
            r"(?i)@{}\s+(review|skip)\b(?:\s+(security|performance|style)\b)?",
            regex::escape(handle)
        );
        let pattern = Regex::new(&pattern).map_err(|e| ValidationError::InvalidFormat {
            field: "mention_handle".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self { pattern })
    }

    pub fn parse(&self, body: &str) -> Option<MentionCommand> {
        let captures = self.pattern.captures(body)?;
        let command = captures.get(1)?.as_str().to_ascii_lowercase();

        if command == "skip" {
            return Some(MentionCommand::Skip);
        }

        let scope = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(ReviewScope::Full);

        Some(MentionCommand::Review { scope })
    }
}

#[cfg(test)]
#[path = "mention_tests.rs"]
mod tests;
