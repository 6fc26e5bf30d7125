//! Bounded retries with backoff for remote backend calls.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::credentials::ProviderKind;
use crate::error::ProviderError;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    #[default]
    Exponential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            strategy: BackoffStrategy::Exponential,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            ..Self::default()
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            strategy: BackoffStrategy::Fixed,
            timeout,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            timeout,
        }
    }

    /// Delay to wait after the given (1-indexed) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
        }
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        attempt < self.max_attempts.max(1) && error.is_retryable()
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. Each attempt is bounded by `timeout`.
    pub async fn run<F, Fut>(&self, provider: ProviderKind, mut call: F) -> Result<String, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider,
                    timeout: self.timeout,
                }),
            };

            match result {
                Ok(text) => {
                    debug!(provider = %provider, attempt, "provider call succeeded");
                    return Ok(text);
                }
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        provider = %provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
