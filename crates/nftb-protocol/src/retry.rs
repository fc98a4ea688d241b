//! Bounded polling with exponential backoff.
//!
//! Only retryable errors (not-ready conditions and transport failures) are
//! retried. Validation failures and on-chain rejections return at once.
//! A wait ends with [`BridgeError::Timeout`] once attempts or the deadline
//! run out, or [`BridgeError::Cancelled`] when the caller's token fires.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use nftb_core::BridgeError;

/// Retry and backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay_ms: u64,
    /// Upper bound on a single delay.
    pub max_delay_ms: u64,
    /// Growth factor between delays.
    pub multiplier: f64,
    /// Overall wall-clock budget.
    pub deadline_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay_ms: 500,
            max_delay_ms: 15_000,
            multiplier: 2.0,
            deadline_ms: Some(30 * 60 * 1_000),
        }
    }
}

impl RetryPolicy {
    /// Fast policy for tests and local chains.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            multiplier: 1.0,
            deadline_ms: None,
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exp);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Call `f` until it succeeds, fails with a non-retryable error, or the
    /// policy is exhausted.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut f: F,
    ) -> Result<T, BridgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let started = Instant::now();
        let deadline = self.deadline_ms.map(|ms| started + Duration::from_millis(ms));
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled {
                    operation: operation.to_string(),
                });
            }
            attempt += 1;
            let err = match f().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            let delay = self.delay_for(attempt);
            let out_of_time = deadline.is_some_and(|d| Instant::now() + delay > d);
            if attempt >= max_attempts || out_of_time {
                tracing::warn!(
                    operation,
                    attempts = attempt,
                    last_error = %err,
                    "giving up"
                );
                return Err(BridgeError::Timeout {
                    operation: operation.to_string(),
                    attempts: attempt,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }

            tracing::debug!(
                operation,
                attempt,
                category = %err.category(),
                "not done yet, retrying in {delay:?}: {err}"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(BridgeError::Cancelled {
                        operation: operation.to_string(),
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
