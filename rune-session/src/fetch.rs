//! Network boundary
//!
//! Every fetch the runtime performs (page documents, fragments,
//! transcripts) is a plain GET through the [`Fetcher`] trait. Success is
//! any 2xx status; everything else, including transport failures, is a
//! [`FetchError`] and handled uniformly by the caller.

use async_trait::async_trait;
use rune_common::SessionConfig;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Header naming the in-place navigation marker
pub const NAVIGATION_MARKER_HEADER: &str = "X-Requested-With";

/// Outgoing GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Response status plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetch failure; all variants are treated alike by callers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, timeout, or body read failure
    #[error("network error: {0}")]
    Network(String),

    /// Response arrived with a non-2xx status
    #[error("HTTP {0}")]
    Status(u16),
}

/// Async GET capability
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request, returning the response whatever its status
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;

    /// Perform the request and return the body of a 2xx response
    async fn get_text(&self, request: FetchRequest) -> Result<String, FetchError> {
        let response = self.get(request).await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }
        Ok(response.body)
    }
}

/// [`Fetcher`] backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &SessionConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        debug!("GET {}", request.url);
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }
}
