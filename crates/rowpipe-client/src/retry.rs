//! Retry Logic with Fixed Backoff
//!
//! Commits are retried with a constant delay between attempts:
//!
//! ```text
//! Attempt 1: immediate
//! Attempt 2: wait backoff
//! Attempt 3: wait backoff
//! ...
//! Attempt max_retries + 1: wait backoff, then give up on failure
//! ```
//!
//! ## Error Classification
//!
//! There is none. Every error is treated as retryable: storage writes are
//! idempotent upserts, so re-applying the same mutations is always safe, and
//! the commit path has no finer failure taxonomy to act on.
//!
//! ## Examples
//!
//! ```ignore
//! use rowpipe_client::retry::{RetryPolicy, retry_with_fixed_backoff};
//!
//! let policy = RetryPolicy::new(10, Duration::from_secs(2));
//!
//! let result = retry_with_fixed_backoff(&policy, |attempt| async move {
//!     commit_once(attempt).await
//! }).await;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy with a constant delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: usize,

    /// Delay between two consecutive attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    /// 10 retries, 2 seconds apart.
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Total attempts this policy allows, the first one included.
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }
}

/// All attempts failed.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of attempts made
    pub attempts: usize,

    /// Error returned by the final attempt
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// `operation` receives the 1-based attempt number. Between attempts the
/// task sleeps for `policy.backoff`; there is no sleep after the final
/// attempt.
///
/// # Returns
///
/// - `Ok((value, attempts))` on the first success
/// - `Err(RetryError)` carrying the last error once every attempt failed
pub async fn retry_with_fixed_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<(T, usize), RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let total = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok((value, attempt));
            }
            Err(e) if attempt >= total => {
                return Err(RetryError {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying after backoff"
                );
                sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.attempts(), 11);
    }

    #[test]
    fn test_zero_retries_means_one_attempt() {
        assert_eq!(fast_policy(0).attempts(), 1);
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_fixed_backoff(&fast_policy(5), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), (42, 1));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let result = retry_with_fixed_backoff(&fast_policy(5), |attempt| async move {
            if attempt < 3 {
                Err(format!("attempt {} failed", attempt))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), ("done", 3));
    }

    #[tokio::test]
    async fn test_exhausted_makes_max_retries_plus_one_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = retry_with_fixed_backoff(&fast_policy(3), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("storage down".to_string())
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error, "storage down");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_every_error_is_retried() {
        // Errors that look permanent are retried like any other.
        let result = retry_with_fixed_backoff(&fast_policy(2), |attempt| async move {
            match attempt {
                1 => Err("400 Bad Request"),
                2 => Err("403 Forbidden"),
                _ => Ok(attempt),
            }
        })
        .await;

        assert_eq!(result.unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn test_last_error_is_reported() {
        let result = retry_with_fixed_backoff(&fast_policy(2), |attempt| async move {
            Err::<(), _>(format!("failure #{}", attempt))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.last_error, "failure #3");
        assert_eq!(err.to_string(), "gave up after 3 attempts: failure #3");
    }

    #[tokio::test]
    async fn test_backoff_separates_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(40));

        let start = tokio::time::Instant::now();
        let _ = retry_with_fixed_backoff(&policy, |_| async { Err::<(), _>("down") }).await;
        let elapsed = start.elapsed();

        // Two sleeps between three attempts, none after the last one.
        assert!(
            elapsed >= Duration::from_millis(75),
            "expected at least ~80ms, got {:?}",
            elapsed
        );
        assert!(
            elapsed < Duration::from_millis(500),
            "unexpected extra delay: {:?}",
            elapsed
        );
    }
}
