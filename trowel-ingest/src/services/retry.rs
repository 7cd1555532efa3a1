//! Bounded retry with exponential backoff
//!
//! One [`RetryPolicy`] value drives both page requests and batch writes; the
//! caller supplies the predicate deciding which errors are worth another try.
//!
//! **Backoff:** `base × 2^(n-1)` before retry `n`, capped at `backoff_cap`.

use std::future::Future;
use std::time::{Duration, Instant};

/// Default ceiling for a single backoff sleep
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (attempts = max_retries + 1)
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

/// Outcome of a retried operation together with the attempts it took
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> Retried<T, E> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            backoff_cap: DEFAULT_BACKOFF_CAP,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.backoff_cap)
            .min(self.backoff_cap)
    }

    /// Run `operation` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the retry budget is spent
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging (e.g., "fetch USD/Bill#14 offset 0")
    /// * `is_retryable` - Predicate over the error of a failed attempt
    /// * `operation` - Async closure performing one attempt
    pub async fn run<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        is_retryable: P,
        mut operation: F,
    ) -> Retried<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms = start_time.elapsed().as_millis() as u64,
                            "Operation succeeded after retry"
                        );
                    }
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    if !is_retryable(&err) {
                        return Retried {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }

                    if attempt >= self.max_attempts() {
                        tracing::error!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms = start_time.elapsed().as_millis() as u64,
                            error = %err,
                            "Retries exhausted"
                        );
                        return Retried {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }

                    let backoff = self.delay_for(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
