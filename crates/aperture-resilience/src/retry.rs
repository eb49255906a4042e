//! Pure retry policy over a caller-supplied operation (spec §4.7).

use std::future::Future;
use std::time::Duration;

use aperture_core::retry_math::backoff_delay;

/// Retry parameters. Delay for attempt *n* follows the full-jitter
/// exponential variant in [`aperture_core::retry_math::backoff_delay`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Ceiling applied to the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
    /// Full-jitter fraction in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter: 0.2,
        }
    }
}

/// The outcome of an exhausted retry loop, carrying the last error so the
/// caller can offer it to the dead-letter queue (spec §4.7, §4.8).
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// The error from the final attempt.
    pub last_error: E,
    /// How many attempts were made before giving up.
    pub attempts: u32,
}

impl RetryPolicy {
    /// Run `op`, retrying per this policy whenever `is_retryable` returns
    /// `true` for the error it produced. Returns the first success, or the
    /// exhausted-retry envelope carrying the final error.
    pub async fn execute<T, E, Op, Fut, Classify>(
        &self,
        mut op: Op,
        is_retryable: Classify,
    ) -> Result<T, RetryExhausted<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classify: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.max_attempts || !is_retryable(&error) {
                        return Err(RetryExhausted { last_error: error, attempts: attempt });
                    }
                    let delay = backoff_delay(
                        attempt,
                        self.initial_delay,
                        self.max_delay,
                        self.backoff_factor,
                        self.jitter,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 1.0,
            jitter: 0.0,
        };
        let attempts = AtomicU32::new(0);
        let result = policy
            .execute(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move { if n < 2 { Err("transient") } else { Ok::<_, &str>("ok") } }
                },
                |_| true,
            )
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);
        let result = policy
            .execute(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("terminal") }
                },
                |_| false,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 1.0,
            jitter: 0.0,
        };
        let result = policy.execute(|| async { Err::<(), _>("fail") }, |_| true).await;
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "fail");
    }
}
