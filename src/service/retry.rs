//! Bounded retry with exponential backoff for provider HTTP calls

use std::future::Future;
use std::time::Duration;

use crate::provider::AnalyzerError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Attempt budget and backoff base for one class of provider call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following the given zero-indexed attempt:
    /// base, 2x base, 4x base, …
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Only rate-limit failures are retried; anything
/// else propagates immediately so the caller can fall back to the next
/// provider. Retries wrap individual HTTP calls, never a whole fallback
/// chain.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    call: &str,
    mut op: F,
) -> Result<T, AnalyzerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalyzerError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    call = call,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_permanent_rate_limit_stops_after_three_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), AnalyzerError> =
            retry_with_backoff(fast_policy(), "upload", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AnalyzerError::RateLimited("429".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(AnalyzerError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_success_after_transient_rate_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_with_backoff(fast_policy(), "messages", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AnalyzerError::Api {
                        status: 429,
                        detail: "rate limit".to_string(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), AnalyzerError> =
            retry_with_backoff(fast_policy(), "messages", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AnalyzerError::InvalidJson)
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(AnalyzerError::InvalidJson)));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_after(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
    }
}
