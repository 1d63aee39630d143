//! Review backend that forwards each job to an HTTP endpoint.

use crate::dispatcher::{ReviewError, ReviewProcessor};
use crate::review::DispatchJob;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// POSTs the [`DispatchJob`] as JSON to the review service.
///
/// 2xx is success, 429 and 5xx are transient, any other status is permanent.
#[derive(Debug, Clone)]
pub struct HttpReviewForwarder {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpReviewForwarder {
    /// # Errors
    ///
    /// Returns [`ReviewError::Permanent`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ReviewError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReviewError::Permanent {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReviewProcessor for HttpReviewForwarder {
    #[instrument(skip(self, job), fields(delivery_id = %job.delivery_id))]
    async fn process(&self, job: &DispatchJob) -> Result<(), ReviewError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Review-Gate-Delivery", job.delivery_id.as_str())
            .json(job)
            .send()
            .await
            .map_err(|e| ReviewError::Transient {
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Review backend responded");

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("review backend returned {}: {}", status.as_u16(), body);
        if status.is_server_error() || status.as_u16() == 429 {
            Err(ReviewError::Transient { message })
        } else {
            Err(ReviewError::Permanent { message })
        }
    }
}

#[cfg(test)]
#[path = "http_review_tests.rs"]
mod tests;
