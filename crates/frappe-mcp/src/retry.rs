//! Retry with exponential backoff.
//!
//! Used by the verified-create path only: every other operation is a single
//! attempt. The delay before retry `n` is `initial_delay * base^(n-1)`,
//! capped at `max_delay`.
//!
//! # Example
//!
//! ```rust,no_run
//! use frappe_mcp::retry::{with_retry, RetryConfig};
//!
//! async fn example() -> Result<String, std::io::Error> {
//!     with_retry(&RetryConfig::creation(3), "example", || async {
//!         Ok("success".to_string())
//!     })
//!     .await
//! }
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Base for exponential backoff
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::creation(3)
    }
}

impl RetryConfig {
    /// Backoff used for verified document creation: 1s, 2s, 4s, ...
    pub fn creation(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .exponential_base
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(
            (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Execute `f` until it succeeds or `max_attempts` is reached.
///
/// Returns the last error when every attempt fails. `operation` labels the
/// log lines.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation, attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt >= config.max_attempts => {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %e,
                    "All retry attempts exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );

                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_creation_backoff_schedule() {
        let config = RetryConfig::creation(4);
        assert_eq!(config.delay_after(1), Duration::from_secs(1));
        assert_eq!(config.delay_after(2), Duration::from_secs(2));
        assert_eq!(config.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::creation(10);
        assert_eq!(config.delay_after(9), Duration::from_secs(60));
    }

    #[test]
    fn test_presets() {
        assert_eq!(RetryConfig::default().max_attempts, 3);
        assert_eq!(RetryConfig::creation(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_first_try() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&RetryConfig::default(), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_after_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&RetryConfig::creation(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err("not yet")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let started = tokio::time::Instant::now();

        let result = with_retry(&RetryConfig::creation(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("always fails")
            }
        })
        .await;

        assert_eq!(result, Err("always fails"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3100));
    }
}
