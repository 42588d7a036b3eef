//! # Retry Coordinator
//!
//! Executes a fallible asynchronous operation with bounded retries,
//! exponential backoff, and jitter. Only failures the configured predicate
//! classifies as transient are retried; everything else is rethrown to the
//! caller unmodified.
//!
//! Attempts for a single call are strictly sequential. Coordinating *across*
//! concurrent callers is the rate limiter's job, not this module's.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use studyforge_core::resilience::retry::{with_retry, RetryOptions, RetryPolicy};
//! use studyforge_core::error::ApiError;
//!
//! # async fn example() -> Result<(), ApiError> {
//! let options = RetryOptions::<ApiError>::new(RetryPolicy::default());
//! let plan = with_retry(
//!     || async {
//!         // provider call that might fail transiently
//!         Ok::<_, ApiError>("lesson plan".to_string())
//!     },
//!     &options,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Classifies an error as worth retrying or not.
///
/// Implemented by error types that can distinguish transient failures
/// (network loss, quota pushback, upstream outage) from permanent ones.
pub trait RetryClassification {
    /// True when a retry has a realistic chance of succeeding
    fn is_retryable(&self) -> bool;
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed beyond the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Hard cap on any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Exponential growth factor between attempts
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            base_delay_ms: defaults::BASE_DELAY_MS,
            max_delay_ms: defaults::MAX_DELAY_MS,
            backoff_factor: defaults::BACKOFF_FACTOR,
        }
    }
}

/// Observer invoked before each backoff sleep: (attempt number, error, delay)
pub type OnRetry<E> = Arc<dyn Fn(u32, &E, Duration) + Send + Sync>;

/// Full retry configuration: the numeric policy plus the retryability
/// predicate and an optional per-retry observer.
#[derive(Clone)]
pub struct RetryOptions<E> {
    /// Backoff timing parameters
    pub policy: RetryPolicy,
    retry_on: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    on_retry: OnRetry<E>,
}

impl<E: 'static> RetryOptions<E> {
    /// Build options with an explicit retryability predicate.
    pub fn with_predicate<F>(policy: RetryPolicy, retry_on: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            policy,
            retry_on: Arc::new(retry_on),
            on_retry: Arc::new(|_, _, _| {}),
        }
    }

    /// Attach an observer invoked before each backoff sleep.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Arc::new(observer);
        self
    }
}

impl<E: RetryClassification + 'static> RetryOptions<E> {
    /// Build options that retry whatever the error type classifies as
    /// transient.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_predicate(policy, E::is_retryable)
    }
}

impl<E: RetryClassification + 'static> Default for RetryOptions<E> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Exponential delay for a 0-based attempt index, before jitter and capping.
///
/// Exposed separately so the monotonic-growth property can be asserted
/// without randomness.
pub fn exponential_delay(attempt: u32, policy: &RetryPolicy) -> f64 {
    policy.base_delay_ms as f64 * policy.backoff_factor.powi(attempt as i32)
}

/// Backoff delay for a 0-based attempt index: exponential growth plus a
/// uniform jitter in `[0, JITTER_RATIO * exponential)`, capped at
/// `max_delay_ms`.
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponential = exponential_delay(attempt, policy);
    let jitter = rand::random::<f64>() * defaults::JITTER_RATIO * exponential;
    let capped = (exponential + jitter).min(policy.max_delay_ms as f64);
    Duration::from_millis(capped as u64)
}

/// Execute `operation`, retrying classifiable transient failures.
///
/// On success the value is returned immediately. On failure, if attempts
/// remain and the predicate accepts the error, the coordinator sleeps out the
/// backoff delay and tries again; otherwise the most recent error is returned
/// unmodified, with no trailing delay.
pub async fn with_retry<T, E, F, Fut>(mut operation: F, options: &RetryOptions<E>) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let policy = &options.policy;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_retries || !(options.retry_on)(&error) {
                    return Err(error);
                }

                let delay = backoff_delay(attempt, policy);
                (options.on_retry)(attempt + 1, &error, delay);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "🔁 Transient failure, backing off before retry"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Reusable retry wrapper: captures options once, accepts the operation per
/// call.
#[derive(Clone, Debug)]
pub struct Retrier<E> {
    options: RetryOptions<E>,
}

impl<E: fmt::Display> Retrier<E> {
    /// Create a retrier from prepared options.
    pub fn new(options: RetryOptions<E>) -> Self {
        Self { options }
    }

    /// Execute an operation under this retrier's policy.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        with_retry(operation, &self.options).await
    }

    /// The configured policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.options.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 10,
            max_delay_ms: 100,
            backoff_factor: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let retries_seen = Arc::new(AtomicU32::new(0));
        let observer_count = Arc::clone(&retries_seen);

        let options = RetryOptions::<ApiError>::new(fast_policy(3))
            .on_retry(move |_, _, _| {
                observer_count.fetch_add(1, Ordering::SeqCst);
            });

        let result = with_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ApiError::Server { status: 503 })
                    } else {
                        Ok("lesson plan")
                    }
                }
            },
            &options,
        )
        .await;

        assert_eq!(result, Ok("lesson plan"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retries_seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_rethrows_last_error() {
        let attempts = AtomicU32::new(0);
        let options = RetryOptions::<ApiError>::new(fast_policy(2));

        let started = Instant::now();
        let result: Result<(), _> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::RateLimited) }
            },
            &options,
        )
        .await;

        assert_eq!(result, Err(ApiError::RateLimited));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two backoff sleeps (attempts 0 and 1), none after the final attempt
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn non_retryable_short_circuits() {
        let attempts = AtomicU32::new(0);
        let options = RetryOptions::<ApiError>::new(fast_policy(3));

        let started = Instant::now();
        let result: Result<(), _> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Client { status: 400 }) }
            },
            &options,
        )
        .await;

        assert_eq!(result, Err(ApiError::Client { status: 400 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // No backoff was incurred
        assert!(started.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn custom_predicate_overrides_classification() {
        let attempts = AtomicU32::new(0);
        // Treat even a client error as retryable
        let options = RetryOptions::<ApiError>::with_predicate(fast_policy(1), |_| true);

        let result: Result<(), _> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Client { status: 404 }) }
            },
            &options,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retrier_reuses_options() {
        let retrier = Retrier::new(RetryOptions::<ApiError>::new(fast_policy(2)));
        let result = retrier.call(|| async { Ok::<_, ApiError>(42) }).await;
        assert_eq!(result, Ok(42));
        assert_eq!(retrier.policy().max_retries, 2);
    }

    proptest! {
        #[test]
        fn exponential_delay_is_monotonic_and_capped(
            base in 1u64..5_000,
            factor in 1.0f64..4.0,
            max in 1_000u64..60_000,
            attempt in 0u32..8,
        ) {
            let policy = RetryPolicy {
                max_retries: 10,
                base_delay_ms: base,
                max_delay_ms: max,
                backoff_factor: factor,
            };

            let current = exponential_delay(attempt, &policy);
            let next = exponential_delay(attempt + 1, &policy);
            prop_assert!(next >= current);

            let jittered = backoff_delay(attempt, &policy);
            prop_assert!(jittered.as_millis() as u64 <= max);
        }
    }
}
