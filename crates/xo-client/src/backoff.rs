//! Exponential backoff for retrying failed calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

/// Exponential backoff schedule with an overall time bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Give up once this much time has passed since the first attempt.
    pub max_elapsed: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_elapsed: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    /// Default schedule bounded by `max_elapsed`.
    #[must_use]
    pub fn bounded(max_elapsed: Duration) -> Self {
        Self {
            max_elapsed,
            ..Self::default()
        }
    }

    /// Calculate delay for the given attempt number (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_millis = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(delay_millis).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with an error `retryable` rejects, or
/// the next delay would exceed the policy's time bound.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    policy: &BackoffPolicy,
    retryable: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !retryable(&e) {
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt);
                if started.elapsed() + delay > policy.max_elapsed {
                    return Err(e);
                }

                warn!(attempt, delay = ?delay, error = %e, "call failed, retrying");
                sleep(delay).await;
            }
        }
    }
}
