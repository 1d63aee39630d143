//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use review_gate_core::{
    GithubRestConfig, InstallationId, MentionParser, RateLimitPolicy, RetryPolicy,
    StaticAllowList, WebhookSecret,
};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Longest accepted rate-limit window or dedup retention: one year.
pub const MAX_PERIOD_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Service configuration
///
/// Every section falls back to its defaults, so a configuration source only
/// has to name the values it changes. The webhook secret and the review
/// endpoint have no usable default and are enforced by [`ServiceConfig::validate`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook ingestion settings
    pub webhooks: WebhookConfig,

    /// Repositories the service will review
    pub allow_list: AllowListConfig,

    /// Per-installation request budgets
    pub rate_limit: RateLimitConfig,

    /// Redelivery detection
    pub deduplication: DeduplicationConfig,

    /// GitHub REST access used to resolve mention triggers
    pub github: GithubConfig,

    /// Downstream review backend
    pub review: ReviewConfig,

    /// Debug record persistence
    pub debug: DebugConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for required values that are absent and
    /// [`ConfigError::Invalid`] for values that are present but unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhooks.secret.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.secret".to_string(),
            });
        }

        if self.webhooks.bot_identity.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.bot_identity".to_string(),
            });
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must start with '/', got '{}'",
                    self.webhooks.endpoint_path
                ),
            });
        }

        self.webhooks.mention_parser()?;
        self.allow_list.build()?;

        if self.rate_limit.default_budget == 0 {
            return Err(ConfigError::Invalid {
                message: "rate_limit.default_budget must be greater than zero".to_string(),
            });
        }

        check_period("rate_limit.window_seconds", self.rate_limit.window_seconds)?;
        check_period(
            "deduplication.retention_seconds",
            self.deduplication.retention_seconds,
        )?;

        if self.github.api_base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "github.api_base_url".to_string(),
            });
        }

        match self.review.endpoint_url.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ConfigError::Missing {
                    key: "review.endpoint_url".to_string(),
                })
            }
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(ConfigError::Invalid {
                    message: format!("review.endpoint_url must be an http(s) URL, got '{}'", url),
                })
            }
            Some(_) => {}
        }

        if self.review.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "review.max_attempts must be at least 1".to_string(),
            });
        }

        if self.review.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                message: "review.backoff_multiplier must be at least 1.0".to_string(),
            });
        }

        Ok(())
    }
}

fn check_period(key: &str, seconds: u64) -> Result<(), ConfigError> {
    if seconds == 0 || seconds > MAX_PERIOD_SECONDS {
        return Err(ConfigError::Invalid {
            message: format!(
                "{} must be between 1 and {} seconds, got {}",
                key, MAX_PERIOD_SECONDS, seconds
            ),
        });
    }
    Ok(())
}

// ============================================================================
// Secrets
// ============================================================================

/// String setting whose value must never reach the logs.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SecretString(<empty>)")
        } else {
            write!(f, "SecretString(<REDACTED>)")
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds, also the drain deadline for
    /// review jobs still running when the server stops
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

/// Webhook ingestion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Shared secret used for `X-Hub-Signature-256`
    pub secret: SecretString,

    /// Substring identifying the bot account among requested reviewers
    pub bot_identity: String,

    /// Handle the bot answers to in comments; defaults to `bot_identity`
    pub mention_handle: Option<String>,
}

impl WebhookConfig {
    pub fn webhook_secret(&self) -> WebhookSecret {
        WebhookSecret::new(self.secret.expose())
    }

    pub fn effective_mention_handle(&self) -> &str {
        self.mention_handle
            .as_deref()
            .unwrap_or(&self.bot_identity)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the handle is empty.
    pub fn mention_parser(&self) -> Result<MentionParser, ConfigError> {
        MentionParser::new(self.effective_mention_handle()).map_err(|e| ConfigError::Invalid {
            message: format!("webhooks.mention_handle: {}", e),
        })
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
            secret: SecretString::default(),
            bot_identity: "argus-ai-assistant".to_string(),
            mention_handle: None,
        }
    }
}

/// Repository allow-list configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AllowListConfig {
    /// Admit every repository
    pub allow_all: bool,

    /// `owner/repo` or `owner/*` patterns
    pub repositories: Vec<String>,
}

impl AllowListConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unusable pattern.
    pub fn build(&self) -> Result<StaticAllowList, ConfigError> {
        StaticAllowList::new(self.allow_all, &self.repositories).map_err(|e| {
            ConfigError::Invalid {
                message: format!("allow_list.repositories: {}", e),
            }
        })
    }
}

/// Budget override for a single installation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstallationBudget {
    pub installation_id: u64,
    pub budget: u32,
}

/// Rate limit configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Accepted deliveries per installation per window
    pub default_budget: u32,

    pub window_seconds: u64,

    pub overrides: Vec<InstallationBudget>,
}

impl RateLimitConfig {
    pub fn policy(&self) -> RateLimitPolicy {
        self.overrides.iter().fold(
            RateLimitPolicy::new(self.default_budget, Duration::from_secs(self.window_seconds)),
            |policy, entry| {
                policy.with_override(InstallationId::new(entry.installation_id), entry.budget)
            },
        )
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_budget: 60,
            window_seconds: 3600,
            overrides: Vec::new(),
        }
    }
}

/// Deduplication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeduplicationConfig {
    /// How long a recorded delivery is remembered
    pub retention_seconds: u64,
}

impl DeduplicationConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            retention_seconds: 24 * 60 * 60,
        }
    }
}

/// GitHub REST API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base_url: String,

    /// Token sent as a bearer credential; anonymous access when absent
    pub token: Option<SecretString>,

    pub user_agent: String,

    pub timeout_seconds: u64,
}

impl GithubConfig {
    pub fn rest_config(&self) -> GithubRestConfig {
        GithubRestConfig {
            base_url: self.api_base_url.clone(),
            token: self
                .token
                .as_ref()
                .filter(|token| !token.is_empty())
                .map(|token| Zeroizing::new(token.expose().to_string())),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            token: None,
            user_agent: "review-gate".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Review backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Endpoint receiving accepted review jobs
    pub endpoint_url: Option<String>,

    pub timeout_seconds: u64,

    /// Total attempts including the first
    pub max_attempts: u32,

    pub initial_delay_ms: u64,

    pub max_delay_ms: u64,

    pub backoff_multiplier: f64,

    pub use_jitter: bool,
}

impl ReviewConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.backoff_multiplier,
        );
        if self.use_jitter {
            policy
        } else {
            policy.without_jitter()
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            timeout_seconds: 30,
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Debug record configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    /// Directory for snapshot and error records; records are only logged when unset
    pub directory: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
