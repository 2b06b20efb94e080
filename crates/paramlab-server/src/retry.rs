//! Bounded retry with exponential backoff for upstream calls
//!
//! A request the backend may already have acted on is only resent when its
//! method is idempotent. Non-idempotent calls (generate, export) are retried
//! solely when the connection was never established.

use rand::Rng;
use reqwest::{Method, StatusCode};
use std::time::Duration;

use crate::config::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self::from(&RetryConfig::default())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether an upstream status is worth another attempt
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// Status retries reach the backend again, so only idempotent calls qualify
    pub fn should_retry_status(method: &Method, status: StatusCode) -> bool {
        method.is_idempotent() && Self::is_retryable_status(status)
    }

    /// A timeout may fire after the backend started work; only idempotent
    /// calls are retried on it
    pub fn should_retry_error(method: &Method, err: &reqwest::Error) -> bool {
        err.is_connect() || (method.is_idempotent() && err.is_timeout())
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped
    /// at `max`, and drawn uniformly from `[0, delay]` when jitter is on.
    pub fn delay_for<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter && !delay.is_zero() {
            let millis = delay.as_millis() as u64;
            Duration::from_millis(rng.gen_range(0..=millis))
        } else {
            delay
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}
