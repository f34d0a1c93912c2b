//! Bounded retry with linear backoff

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::FetchError;

/// How many times one provider is tried and how long to wait in between
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Attempt `n` (1-based) is followed by a `n * base_delay` pause
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay: config.retry_base_delay(),
        }
    }

    /// Pause after the given failed attempt
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&HttpConfig::default())
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out.
///
/// A rate limit is returned on first sight: retrying into a throttle only
/// extends it.
///
/// # Errors
///
/// Returns the last error from `f`.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, name: &str, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempts >= policy.max_attempts {
                    debug!(provider = name, attempts, error = %e, "Max retry attempts reached");
                    return Err(e);
                }

                let delay = policy.delay_after(attempts);
                debug!(
                    provider = name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Retrying after backoff"
                );
                sleep(delay).await;
            }
        }
    }
}
