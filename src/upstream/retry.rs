//! Bounded exponential backoff for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::error::GatewayError;

/// Retry and timeout settings for one collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for a single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            attempt_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    ///
    /// Each attempt is bounded by `attempt_timeout`; an elapsed attempt
    /// becomes [`GatewayError::UpstreamTimeout`]. Dropping the returned
    /// future cancels the attempt in flight.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error.
    pub async fn execute<F, Fut, T>(&self, what: &str, operation: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, GatewayError>> + Send,
        T: Send,
    {
        let mut attempt = 0_u32;
        let mut backoff = self.initial_backoff;
        let max_backoff_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);

        loop {
            let result = match timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::UpstreamTimeout {
                    timeout_ms: u64::try_from(self.attempt_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= self.retries => {
                    tracing::error!(what, attempts = attempt + 1, error = %e, "upstream call failed");
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let jitter = rand::random::<u64>() % 100;
                    let delay = backoff + Duration::from_millis(jitter);
                    tracing::warn!(
                        what,
                        attempt,
                        retries = self.retries,
                        error = %e,
                        ?delay,
                        "upstream call failed, retrying"
                    );
                    sleep(delay).await;
                    let next_ms = u64::try_from(backoff.as_millis())
                        .unwrap_or(u64::MAX)
                        .saturating_mul(2)
                        .min(max_backoff_ms);
                    backoff = Duration::from_millis(next_ms);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            attempt_timeout: Duration::from_millis(200),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast_policy(3)
            .execute("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GatewayError::UpstreamFetch {
                            status: Some(503),
                            message: "busy".to_string(),
                        })
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast_policy(3)
            .execute("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::UpstreamFetch {
                        status: Some(400),
                        message: "bad request".to_string(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_is_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast_policy(2)
            .execute("test", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::UpstreamFetch {
                        status: None,
                        message: "refused".to_string(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(10),
            ..fast_policy(0)
        };
        let result: Result<(), _> = policy
            .execute("test", || async {
                sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(GatewayError::UpstreamTimeout { timeout_ms: 10 }));
    }
}
