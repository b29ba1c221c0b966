//! Generic retry/backoff harness used around every store mutation.

use std::time::Duration;

use crate::{Result, StoreError};

/// Retry policy with exponential backoff.
///
/// Retries only errors classified retryable by [`StoreError::is_retryable`];
/// authorization and not-found failures rethrow immediately. Exhausting the
/// attempt budget rethrows the last error — the harness never converts
/// failure into success.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try.
    pub max_attempts: u32,
    /// Wait before attempt `n+1` is `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff before the attempt following `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Executes `op`, retrying retryable failures with exponential backoff.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if attempt >= max_attempts {
                        return Err(err);
                    }
                    metrics::counter!("store_retries_total").increment(1);
                    tracing::warn!(%err, attempt, "retrying store operation");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
