//! Retry utilities for resilient operations
//!
//! An explicit [`RetryPolicy`] composed around a fallible async operation.
//! Delay after the failed attempt `n` (0-based) is
//! `min(base * multiplier^n, max)` plus uniform jitter of up to
//! `jitter_ratio` of that delay.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::shutdown::ShutdownSignal;

/// Retry behaviour for one kind of operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,

    /// Upper bound of the random jitter as a fraction of the delay
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry policy with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            ..Default::default()
        }
    }

    /// Disable jitter (deterministic backoff)
    pub fn without_jitter(mut self) -> Self {
        self.jitter_ratio = 0.0;
        self
    }

    /// Total number of attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before jitter for the failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let capped = if exponential.is_finite() {
            (exponential as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped)
    }

    /// Backoff plus jitter in `[0, jitter_ratio * backoff]`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let spread = base.as_secs_f64() * self.jitter_ratio.max(0.0);
        if spread <= 0.0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=spread);
        base + Duration::from_secs_f64(jitter)
    }
}

/// Execute an operation with retry logic and exponential backoff
///
/// Returns `Ok(T)` on success, or the last error once all attempts fail.
///
/// # Example
///
/// ```no_run
/// use newswatch::utils::retry::{with_retry, RetryPolicy};
///
/// # async fn fetch_data() -> Result<String, std::io::Error> { Ok("data".into()) }
/// #[tokio::main]
/// async fn main() -> Result<(), std::io::Error> {
///     let policy = RetryPolicy::default();
///     let body = with_retry(&policy, || async { fetch_data().await }).await?;
///     println!("{body}");
///     Ok(())
/// }
/// ```
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_until(policy, &ShutdownSignal::never(), operation, |_| true).await
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// Errors rejected by `should_retry` are returned immediately.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    with_retry_until(policy, &ShutdownSignal::never(), operation, should_retry).await
}

/// Retry loop that also stops when `shutdown` fires.
///
/// Cancellation is checked before every retry and interrupts a backoff
/// sleep; the last error is returned in that case.
pub async fn with_retry_until<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    shutdown: &ShutdownSignal,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if !should_retry(&err) {
            warn!(error = %err, "Non-retryable error encountered");
            return Err(err);
        }
        if attempt >= policy.max_retries {
            warn!(
                attempts = attempt + 1,
                error = %err,
                "Retries exhausted"
            );
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            attempt = attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, will retry"
        );

        let mut cancel = shutdown.clone();
        if cancel.is_cancelled() {
            debug!("Shutdown requested, abandoning retries");
            return Err(err);
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                debug!("Shutdown requested during backoff");
                return Err(err);
            }
        }
        attempt += 1;
    }
}
