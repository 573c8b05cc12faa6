///! Shared HTTP access for the external astronomy services
///!
///! Every request gets a bounded timeout and at most `retries` extra attempts.
///! Only transport faults and 5xx answers are retried.

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::error::{FailureReason, TransferFailure};

const RETRY_DELAY_SECONDS: u64 = 2;

/// Blocking-style fetcher: one request in flight at a time
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            retries: config.retries,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    /// GET `url` and return the body of a successful response
    pub async fn get_bytes(&self, url: &Url) -> std::result::Result<Vec<u8>, TransferFailure> {
        let attempts = self.retries + 1;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tracing::debug!(
                    "Retrying {} after {:?} (attempt {}/{})",
                    url,
                    self.retry_delay,
                    attempt,
                    attempts
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.fetch_attempt(url).await {
                Ok(body) => return Ok(body),
                Err(failure) if attempt < attempts && failure.reason.is_retryable() => {
                    tracing::warn!("Attempt {}/{} failed: {}", attempt, attempts, failure);
                }
                Err(failure) => return Err(failure),
            }
        }

        Err(TransferFailure::transport(url.as_str(), "no attempts made"))
    }

    /// Single fetch attempt
    async fn fetch_attempt(&self, url: &Url) -> std::result::Result<Vec<u8>, TransferFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransferFailure::transport(url.as_str(), e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(TransferFailure {
                url: url.to_string(),
                reason: FailureReason::Status(status.as_u16()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransferFailure::transport(url.as_str(), e.to_string()))?;

        Ok(body.to_vec())
    }
}

/// Append query parameters to a base endpoint
pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(base, params).context(format!("Invalid service URL: {}", base))
}
