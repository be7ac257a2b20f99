//! Bounded exponential-backoff retry for fallible storage operations.

use std::future::Future;
use std::time::Duration;

use crate::errors::AppError;

/// Attempt budget and base delay for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_READ: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1000));
    pub const DEFAULT_WRITE: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(500));

    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before the attempt following `attempt` (1-indexed): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails deterministically, or the budget runs out.
    ///
    /// Validation and not-found failures are returned as-is on first occurrence.
    /// Exhaustion yields `AppError::Storage` carrying the attempt count and the
    /// last failure. The backoff suspends the task rather than blocking the thread.
    pub async fn run<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            tracing::warn!(
                operation = operation_name,
                attempt,
                max_attempts,
                "Operation failed: {}",
                error
            );

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_attempts {
                return Err(AppError::Storage {
                    message: format!(
                        "Operation failed after {} attempts: {}",
                        max_attempts,
                        error.message()
                    ),
                    attempts: Some(max_attempts),
                    source: Some(Box::new(error)),
                });
            }

            tokio::time::sleep(self.backoff(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> AppError {
        AppError::file_write("Failed to write", Path::new("todos.json"), "busy")
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_two_backoffs() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = tokio::time::Instant::now();

        let result = policy
            .run("flaky", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms after the first failure, 200ms after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = tokio::time::Instant::now();

        let result: Result<(), AppError> = policy
            .run("lookup", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("todo", "missing"))
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), AppError> = policy
            .run("validate", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::validation("bad shape"))
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), AppError> = policy
            .run("write", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(AppError::Storage {
                message,
                attempts,
                source,
            }) => {
                assert!(message.contains("3 attempts"));
                assert_eq!(attempts, Some(3));
                assert!(matches!(source.as_deref(), Some(AppError::FileWrite { .. })));
            }
            other => panic!("expected storage error, got {:?}", other),
        }
    }
}
