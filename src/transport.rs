//! HTTP transport layer
//!
//! The transport performs a single GET and normalizes every failure into
//! [`ApiError`]. Retrying, caching and decoding happen above it.

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Instant;

use crate::{config::ClientConfig, error::ApiError};

/// Issues one GET request and returns the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `path` (relative to the API root) with the given query pairs
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<String, ApiError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport using the timeout and user agent from `config`
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        tracing::debug!(url = %url, params = query.len(), "API request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "API request failed without response");
                ApiError::from(e)
            })?;

        let status = response.status();
        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "API response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        response.text().await.map_err(ApiError::from)
    }
}
