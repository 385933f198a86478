//! Bounded retry for calls to external services
//!
//! Unlike database lock retries (time budget), external calls get a fixed
//! number of attempts with exponential backoff between them. Callers decide
//! which failures are worth retrying.

use std::future::Future;
use std::time::Duration;

use crate::models::ClassifierParameters;

/// Attempt budget and backoff for one external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub initial_backoff: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
            timeout: Duration::from_secs(5),
        }
    }
}

impl From<&ClassifierParameters> for RetryPolicy {
    fn from(params: &ClassifierParameters) -> Self {
        Self {
            max_attempts: params.external_max_attempts.max(1),
            timeout: Duration::from_millis(params.external_timeout_ms),
            ..Self::default()
        }
    }
}

/// Terminal outcome of a retried call
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent. `is_transient` decides whether an error is retried.
pub async fn retry_transient<F, Fut, T, E>(
    operation_name: &str,
    policy: RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient(&err) || attempt >= max_attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "External call failed, giving up"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "External call failed, retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_budget_spent() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(
            "test_op",
            fast_policy(2),
            |_: &String| true,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("timeout".to_string()) }
            },
        )
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(
            "test_op",
            fast_policy(3),
            |_: &String| false,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("bad request".to_string()) }
            },
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_one_failure() {
        let result = retry_transient(
            "test_op",
            fast_policy(2),
            |_: &String| true,
            |attempt| async move {
                if attempt == 1 {
                    Err("reset".to_string())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let params = ClassifierParameters {
            external_max_attempts: 0,
            ..ClassifierParameters::default()
        };
        assert_eq!(RetryPolicy::from(&params).max_attempts, 1);
    }
}
