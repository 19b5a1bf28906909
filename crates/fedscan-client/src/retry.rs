//! Bounded exponential-backoff retry for client calls.
//!
//! Used where a failure is fatal for the operation anyway (authoritative
//! metadata fetch, advisory index count), so a handful of attempts is the
//! right trade. The inventory fetcher deliberately does NOT use this policy;
//! its page retries are unbounded and live in `fedscan-recon`.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: u64,
    /// Maximum delay cap in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 1,
            max_delay_secs: 30,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given max retries and base delay. The delay
    /// cap defaults to 30 seconds.
    #[must_use]
    pub fn new(max_retries: u32, base_delay_secs: u64) -> Self {
        Self {
            max_retries,
            base_delay_secs,
            max_delay_secs: 30,
        }
    }

    /// Whether the error should be retried at the given attempt number.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &ClientError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay before the given attempt: `min(base * 2^attempt, max)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self
            .base_delay_secs
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }

    /// Execute an async operation with retry.
    ///
    /// The closure is called until it succeeds, a non-retryable error occurs,
    /// or the retry budget is exhausted; the last error is returned as-is.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut f: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if attempt > 0 {
                            warn!(
                                operation = operation_name,
                                attempts = attempt + 1,
                                error = %error,
                                "Giving up after retries"
                            );
                        }
                        return Err(error);
                    }
                    let delay = self.delay_for(attempt);
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Retrying after transient error"
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
    use std::sync::Arc;

    fn transient() -> ClientError {
        ClientError::UnexpectedStatus {
            status: 503,
            url: "https://mn.example.org/v2/object".into(),
            detail: "unavailable".into(),
        }
    }

    #[test]
    fn delay_is_exponential_and_capped() {
        let policy = RetryPolicy::new(6, 1);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30)); // capped
    }

    #[test]
    fn should_retry_respects_budget_and_kind() {
        let policy = RetryPolicy::new(2, 1);
        assert!(policy.should_retry(0, &transient()));
        assert!(policy.should_retry(1, &transient()));
        assert!(!policy.should_retry(2, &transient()));

        let fatal = ClientError::not_found("urn:node:CN", "pid X");
        assert!(!policy.should_retry(0, &fatal));
    }

    #[tokio::test]
    async fn execute_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, 0);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn execute_stops_on_non_retryable() {
        let policy = RetryPolicy::new(3, 0);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: ClientResult<()> = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::not_found("urn:node:MN1", "pid X"))
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::NotFound { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_exhausts_budget() {
        let policy = RetryPolicy::new(2, 0);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: ClientResult<()> = policy
            .execute("test_op", move || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3); // initial + 2 retries
    }
}
