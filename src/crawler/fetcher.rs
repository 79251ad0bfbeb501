//! HTTP fetcher implementation
//!
//! This module issues single GET requests for the crawler:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Logging each URL before it is requested
//! - Classifying failures into `TransportError`
//!
//! There is no retry logic here; retries are the orchestrator's decision.

use crate::config::CrawlerConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a page body
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed for {url}: {source}")]
    Request { url: String, source: reqwest::Error },
}

impl TransportError {
    /// The URL that failed
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::Request { url, .. } => url,
        }
    }

    fn classify(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect { url, source: error }
        } else {
            Self::Request { url, source: error }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sj_feeds::config::CrawlerConfig;
/// use sj_feeds::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page Fetcher: one GET per call, body on 2xx, `TransportError` otherwise
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with a client built from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and returns its body
    pub async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        fetch_page(&self.client, url).await
    }
}

/// Fetches a URL with a single GET request
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | body text |
/// | any other status | `Status` |
/// | timeout (request or body) | `Timeout` |
/// | connection refused / DNS / TLS | `Connect` |
/// | anything else | `Request` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, TransportError> {
    tracing::info!(url, "Visiting");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::classify(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| TransportError::classify(url, e))
}
