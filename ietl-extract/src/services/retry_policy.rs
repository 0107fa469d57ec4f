//! Bounded retry policy
//!
//! One object carries max attempts, the per-attempt timeout and the backoff
//! function. Used for AI completion calls and for status polling. All waiting
//! goes through `tokio::time`, so tests drive it with a paused clock.

use ietl_common::config::AiConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// Doubles after each failed attempt, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    /// Bound on a single attempt; `None` means unbounded
    pub attempt_timeout: Option<Duration>,
    pub backoff: Backoff,
}

/// Outcome after the policy gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("timed out after {attempts} attempt(s)")]
    TimedOut { attempts: u32 },

    #[error("failed after {attempts} attempt(s): {last_error}")]
    Failed { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::TimedOut { attempts } | RetryError::Failed { attempts, .. } => *attempts,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Option<Duration>, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            backoff,
        }
    }

    /// Single attempt, no timeout
    pub fn once() -> Self {
        Self::new(1, None, Backoff::None)
    }

    /// Poll up to `max_attempts` times, `interval` apart
    pub fn polling(max_attempts: u32, interval: Duration) -> Self {
        Self::new(max_attempts, None, Backoff::Fixed(interval))
    }

    /// Policy for completion calls from the `[ai]` config section
    pub fn from_ai_config(config: &AiConfig) -> Self {
        Self::new(
            config.max_attempts,
            Some(Duration::from_millis(config.timeout_ms)),
            Backoff::Exponential {
                initial: Duration::from_millis(config.backoff_ms),
                max: Duration::from_millis(config.max_backoff_ms),
            },
        )
    }

    /// Same policy with `limit` as the per-attempt timeout when none is set
    pub fn with_default_timeout(self, limit: Duration) -> Self {
        Self {
            attempt_timeout: Some(self.attempt_timeout.unwrap_or(limit)),
            ..self
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(31);
                initial
                    .checked_mul(1u32 << shift)
                    .unwrap_or(max)
                    .min(max)
            }
        }
    }

    /// Run `operation` under this policy
    ///
    /// Timeouts are always retried. Errors are retried only when `retryable`
    /// says so; anything else is returned immediately.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        operation_name: &str,
        mut operation: F,
        retryable: R,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let outcome = match self.attempt_timeout {
                Some(limit) => tokio::time::timeout(limit, operation()).await.ok(),
                None => Some(operation().await),
            };

            let last = attempt >= self.max_attempts;
            let failure = match outcome {
                Some(Ok(value)) => {
                    if attempt > 1 {
                        tracing::debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                None => {
                    tracing::warn!(operation = operation_name, attempt, "Attempt timed out");
                    if last {
                        return Err(RetryError::TimedOut { attempts: attempt });
                    }
                    None
                }
                Some(Err(e)) => {
                    if !retryable(&e) || last {
                        return Err(RetryError::Failed {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    Some(e)
                }
            };

            let delay = self.delay_for(attempt);
            if let Some(e) = failure {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
