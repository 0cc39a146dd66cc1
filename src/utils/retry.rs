use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            super::DEFAULT_CONNECT_ATTEMPTS,
            Duration::from_secs(super::DEFAULT_CONNECT_DELAY_SECS),
        )
    }
}

/// Waits between attempts. Tests swap in a recording implementation.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Last error seen and how many attempts were made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub error: E,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is reached. The operation receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    is_retryable: P,
    mut operation: F,
) -> std::result::Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_retryable(&error) => {
                warn!(
                    attempt,
                    max_attempts,
                    error = %error,
                    "Target not ready yet, retrying in {:?}",
                    policy.delay
                );
                sleeper.sleep(policy.delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_secs(3))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = retry(&policy(), &sleeper, |_: &String| true, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt <= 3 {
                    Err(format!("refused #{}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(3); 3]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts_with_last_error() {
        let sleeper = RecordingSleeper::default();

        let failure = retry(&policy(), &sleeper, |_: &String| true, |attempt| async move {
            Err::<(), _>(format!("refused #{}", attempt))
        })
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 5);
        assert_eq!(failure.error, "refused #5");
        // No sleep after the final attempt
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_surfaces_immediately() {
        let sleeper = RecordingSleeper::default();

        let failure = retry(
            &policy(),
            &sleeper,
            |e: &String| e != "password authentication failed",
            |_| async { Err::<(), _>("password authentication failed".to_string()) },
        )
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(0, Duration::from_secs(1));

        let value = retry(&policy, &sleeper, |_: &String| true, |_| async {
            Ok::<_, String>("up")
        })
        .await
        .unwrap();

        assert_eq!(value, "up");
    }
}
