//! Bounded exponential backoff for storage writes and dead-letter publishes.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::RetryConfig;
use crate::messaging::MessagingError;
use crate::storage::StorageError;

/// Errors that may succeed on a later attempt
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for StorageError {
    fn is_retryable(&self) -> bool {
        StorageError::is_retryable(self)
    }
}

impl IsRetryable for MessagingError {
    fn is_retryable(&self) -> bool {
        MessagingError::is_retryable(self)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
        }
    }

    /// Attempt once, never sleep
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay after the failed attempt number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = (self.initial_backoff.as_millis() as f64 * factor)
            .min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Why [`with_retry`] gave up
#[derive(Debug)]
pub struct RetryError<E> {
    pub error: E,
    /// Attempts made, including the one that produced `error`
    pub attempts: u32,
    /// `true` when every attempt failed with a retryable error
    pub exhausted: bool,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if !error.is_retryable() {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: false,
                    });
                }
                if attempt >= max_attempts {
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: true,
                    });
                }

                let delay = policy.delay_for_attempt(attempt - 1);
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
