//! Retry with exponential backoff for external calls
//!
//! **Algorithm:**
//! 1. Run the attempt under the per-attempt timeout
//! 2. Success, or a non-transient error: return it
//! 3. Transient error (network, timeout, 5xx):
//!    a. Final attempt: return the error (`Timeout` for a timed-out attempt)
//!    b. Otherwise: back off `min(base * factor^(n-1), max)` and retry
//!
//! Cancellation wins over everything: a cancelled token interrupts both the
//! attempt in flight and a pending backoff sleep with `SourceError::Cancelled`.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::SourceError;

/// Retry policy shared by every source adapter and registry lookup
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_factor: config.backoff_factor.max(1.0),
            max_delay: Duration::from_millis(config.max_delay_ms),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Whether `error` qualifies for another attempt
    pub fn is_retryable(&self, error: &SourceError) -> bool {
        error.is_transient()
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `operation` under this policy
    ///
    /// # Arguments
    /// * `label` - Name for logging (e.g., "receitaws lookup")
    /// * `cancel` - Token cancelled when the caller's deadline fires
    /// * `operation` - Closure producing one attempt
    pub async fn run<F, Fut, T>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                debug!(source = label, attempt, "Retrying source call");
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                outcome = tokio::time::timeout(self.attempt_timeout, operation()) => outcome,
            };

            let err = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_elapsed) => SourceError::Timeout,
            };

            if !self.is_retryable(&err) {
                debug!(source = label, attempt, error = %err, "Permanent failure, not retrying");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                warn!(
                    source = label,
                    attempt,
                    error = %err,
                    "Source call failed after max attempts"
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            debug!(
                source = label,
                attempt,
                error = %err,
                backoff_ms = delay.as_millis() as u64,
                "Transient failure, will retry after backoff"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
