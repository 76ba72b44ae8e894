//! Async HTTP client for fetching remote diploma documents.
//!
//! Every request carries an explicit timeout; a timed-out or failed
//! fetch is reported as a fetch error and never retried automatically —
//! retry policy belongs to the operator re-submitting the batch.

use std::time::Duration;

use reqwest::Client;
use tokio::time::timeout;

use crate::error::FetchError;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 20,
            user_agent: format!("diploma-fiscal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Async HTTP client for downloading secondary documents.
#[derive(Clone)]
pub struct AsyncHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch the body of one diploma document.
    ///
    /// Non-success status codes and timeouts are errors; there is
    /// exactly one attempt per URL.
    pub async fn fetch_xml(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request = self.client.get(url).send();

        let response = timeout(Duration::from_secs(self.config.timeout_seconds), request)
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout_seconds: self.config.timeout_seconds,
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
