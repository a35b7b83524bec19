//! Bounded retry policy for remote operations.
//!
//! The policy knows nothing about HTTP: it retries any fallible async action a
//! fixed number of times with a fixed pause in between. Callers decide which
//! outcomes count as failures (a 404 from the recipe server, for instance, is
//! returned as a successful value and therefore never retried).

use crate::constants::{FETCH_ATTEMPTS, FETCH_RETRY_DELAY};
use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

/// Number of attempts and pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: usize,
    /// Fixed pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: FETCH_ATTEMPTS,
            delay: FETCH_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with an explicit attempt count and delay.
    #[must_use]
    pub const fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
        }
    }

    /// Delays between attempts; one less than the attempt count.
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.delay).take(self.attempts.saturating_sub(1))
    }

    /// Runs `action` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<T, E, F, Fut>(&self, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0usize;
        Retry::spawn(self.strategy(), || {
            attempt += 1;
            let current = attempt;
            let future = action();
            async move {
                let result = future.await;
                if let Err(e) = &result {
                    tracing::debug!("Attempt {} failed: {}", current, e);
                }
                result
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let counter = calls.clone();
        let result: Result<&str, String> = policy
            .run(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("connection reset".to_string())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let counter = calls.clone();
        let result: Result<(), String> = policy
            .run(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("timeout".to_string())
                }
            })
            .await;

        assert_eq!(result.unwrap_err(), "timeout");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(100));
        assert_eq!(policy.strategy().count(), 2);
    }
}
