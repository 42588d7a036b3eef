//! # Resilience Module
//!
//! Temporal fault-handling around provider calls: bounded retry with
//! exponential backoff and jitter, and FIFO-fair dispatch pacing.
//!
//! - **Retry Coordinator** ([`retry`]): sequences attempts of a single
//!   logical call, recovering classifiable transient failures locally.
//! - **Rate Limiter** ([`rate_limiter`]): coordinates *across* concurrent
//!   callers so dispatches never exceed the configured rate.
//!
//! The two compose: wrap the rate-limited dispatch in the retry coordinator
//! so each retry attempt is paced like any other call (see
//! [`crate::client::ProviderClient`]).

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::RateLimiter;
pub use retry::{
    backoff_delay, exponential_delay, with_retry, Retrier, RetryClassification, RetryOptions,
    RetryPolicy,
};
