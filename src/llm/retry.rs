//! Bounded retry with exponential backoff for hosted API calls.
//!
//! Only errors reported as transient by [`RecapError::is_transient`] are
//! retried. The sleep is injected so tests can run without a real clock.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::settings::RetryConfig;
use crate::error::{RecapError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// `min(base * 2^attempt, max)` for a 0-indexed retry attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{} failed ({}), retrying in {:?} ({}/{})",
                    label,
                    e,
                    delay,
                    attempt + 1,
                    policy.max_retries
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(terminal(e)),
        }
    }
}

fn terminal(error: RecapError) -> RecapError {
    match error {
        RecapError::Http(e) => RecapError::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: format!("Request failed: {}", e.without_url()),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(100),
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = policy(10);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result = with_retry(&policy(3), &sleeper, "test", move || async move {
            if calls_ref.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RecapError::provider(429, "rate limited"))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<()> = with_retry(&policy(2), &sleeper, "test", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(RecapError::provider(503, "unavailable"))
        })
        .await;

        assert!(matches!(
            result,
            Err(RecapError::Provider {
                status: Some(503),
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<()> = with_retry(&policy(5), &sleeper, "test", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(RecapError::provider(401, "Invalid API key"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }
}
