use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{CollectorTransport, Submission, CLIENT_VERSION};
use crate::error::ForwardError;

/// HTTP transport. One pooled client per registration.
#[derive(Clone)]
pub struct HttpCollector {
    client: Client,
    endpoint: String,
}

impl HttpCollector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout) // bounds the final join in before-reply
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CollectorTransport for HttpCollector {
    async fn submit(&self, submission: Submission) -> Result<(), ForwardError> {
        let api_key = submission
            .api_key
            .ok_or_else(|| ForwardError::MissingApiKey(submission.platform.as_str().to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("platform", submission.platform.as_str()),
                ("v", CLIENT_VERSION),
                ("type", submission.kind.as_str()),
                ("apiKey", api_key.as_str()),
            ])
            .json(&submission.body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForwardError::Status { status: status.as_u16(), body });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
