//! Retry policies
//!
//! Two layers retry independently:
//!
//! - [`RetryPolicy`] wraps every HTTP request. Rate limits back off linearly,
//!   server errors wait a fixed delay, everything else fails at once.
//! - [`BackoffPolicy`] wraps a whole page query in the dataset controller with
//!   capped exponential backoff. `NotFound` is final.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ApiError;

/// Request-level retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before the next attempt after `error` failed attempt number `attempt` (1-based)
    ///
    /// `None` means the error is final.
    pub fn delay_for(&self, error: &ApiError, attempt: u32) -> Option<Duration> {
        match error {
            ApiError::RateLimited => Some(self.base_delay.saturating_mul(attempt)),
            ApiError::Server { .. } => Some(self.base_delay),
            _ => None,
        }
    }

    /// Runs `op` until it succeeds, fails with a final error, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                return Err(err);
            }
            let Some(delay) = self.delay_for(&err, attempt) else {
                return Err(err);
            };

            tracing::warn!(
                request = label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::constants::MAX_RETRY_ATTEMPTS,
            Duration::from_millis(crate::constants::RETRY_BASE_DELAY_MS),
        )
    }
}

/// Query-level retry with capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(retries: u32, initial: Duration, max: Duration) -> Self {
        Self {
            retries,
            initial,
            max,
        }
    }

    /// No retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Wait before retry number `retry` (0-based): `min(initial * 2^retry, max)`
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retry = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(ApiError::NotFound) => return Err(ApiError::NotFound),
                Err(e) if retry < self.retries => {
                    let delay = self.delay(retry);
                    tracing::warn!(
                        query = label,
                        retry = retry + 1,
                        retries = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Query failed, backing off"
                    );
                    sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
