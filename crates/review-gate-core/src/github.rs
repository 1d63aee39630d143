//! Pull request lookup used by comment-triggered reviews.

use crate::review::PullRequestData;
use crate::{InstallationId, RepositoryName};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Fetches the full pull request for a repository and number.
#[async_trait]
pub trait PullRequestFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FetchError`] when the pull request cannot be retrieved.
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: u64,
        installation: InstallationId,
    ) -> Result<PullRequestData, FetchError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Pull request {repository}#{number} not found")]
    NotFound { repository: String, number: u64 },

    #[error("GitHub rejected the credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("GitHub returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Request to GitHub failed: {message}")]
    Transport { message: String },

    #[error("Unexpected pull request response: {message}")]
    InvalidResponse { message: String },
}

impl FetchError {
    /// Whether a later attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Transport { .. } => true,
            Self::NotFound { .. } | Self::Unauthorized { .. } | Self::InvalidResponse { .. } => {
                false
            }
        }
    }
}

// ============================================================================
// GithubRestClient
// ============================================================================

/// Connection settings for [`GithubRestClient`].
#[derive(Clone)]
pub struct GithubRestConfig {
    pub base_url: String,
    pub token: Option<Zeroizing<String>>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GithubRestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token: None,
            user_agent: "review-gate".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for GithubRestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubRestConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`PullRequestFetcher`] over the GitHub REST API
/// (`GET /repos/{owner}/{repo}/pulls/{number}`).
#[derive(Debug, Clone)]
pub struct GithubRestClient {
    http: reqwest::Client,
    config: GithubRestConfig,
}

impl GithubRestClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: GithubRestConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    fn pull_request_url(&self, repository: &RepositoryName, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.config.base_url.trim_end_matches('/'),
            repository.owner(),
            repository.name(),
            number
        )
    }
}

#[async_trait]
impl PullRequestFetcher for GithubRestClient {
    #[instrument(skip(self), fields(repository = %repository, pr_number = number, installation_id = %installation))]
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: u64,
        installation: InstallationId,
    ) -> Result<PullRequestData, FetchError> {
        let url = self.pull_request_url(repository, number);

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await.map_err(|e| FetchError::Transport {
            message: e.to_string(),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "GitHub responded");

        match status {
            s if s.is_success() => {
                response
                    .json::<PullRequestData>()
                    .await
                    .map_err(|e| FetchError::InvalidResponse {
                        message: e.to_string(),
                    })
            }
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                repository: repository.full_name(),
                number,
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthorized {
                status: status.as_u16(),
            }),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(FetchError::UpstreamStatus {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
