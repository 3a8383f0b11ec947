//! Runtime configuration for the client and the dataset controller

use std::time::Duration;

use crate::constants::{
    CACHE_TTL_SECS, COINGECKO_API_URL, DEFAULT_PAGE_SIZE, HIGHLIGHT_LIMIT, MAX_RETRY_ATTEMPTS,
    QUERY_INITIAL_BACKOFF_MS, QUERY_MAX_BACKOFF_MS, QUERY_RETRIES, REFRESH_INTERVAL_SECS,
    REQUEST_TIMEOUT_SECS, RETRY_BASE_DELAY_MS, SEARCH_DEBOUNCE_MS, USER_AGENT,
};
use crate::retry::{BackoffPolicy, RetryPolicy};

/// Settings of the remote data source client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Request-level retry policy
    pub retry: RetryPolicy,
    /// Freshness window of cached market pages
    pub cache_ttl: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::new(
                MAX_RETRY_ATTEMPTS,
                Duration::from_millis(RETRY_BASE_DELAY_MS),
            ),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the environment
    ///
    /// Reads `COINGECKO_API_URL`, `MARKET_REQUEST_TIMEOUT_SECS` and
    /// `MARKET_CACHE_TTL_SECS`. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("COINGECKO_API_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = env_secs("MARKET_REQUEST_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("MARKET_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

fn env_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "Ignoring invalid environment override");
            None
        }
    }
}

/// Settings of the dataset controller
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Run the periodic refresh task when started
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
    /// Assets per market page
    pub page_size: u32,
    /// Entries per highlight list
    pub highlight_limit: usize,
    /// Quiet period before a search term takes effect
    pub search_debounce: Duration,
    /// Retry applied around a whole page query
    pub query_retry: BackoffPolicy,
    /// Freshness window of the cached highlight bundle
    pub highlight_ttl: Duration,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            auto_refresh: false,
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            highlight_limit: HIGHLIGHT_LIMIT,
            search_debounce: Duration::from_millis(SEARCH_DEBOUNCE_MS),
            query_retry: BackoffPolicy::new(
                QUERY_RETRIES,
                Duration::from_millis(QUERY_INITIAL_BACKOFF_MS),
                Duration::from_millis(QUERY_MAX_BACKOFF_MS),
            ),
            highlight_ttl: Duration::from_secs(CACHE_TTL_SECS),
        }
    }
}
