//! # StudyForge Core
//!
//! Resilience and caching primitives for the StudyForge AI tutoring client.
//!
//! ## Overview
//!
//! The client assembles lesson material by calling a hosted generative-AI
//! provider. Those calls are expensive, quota-limited, and occasionally
//! flaky; this crate supplies the three infrastructure pieces that make them
//! tolerable, plus the thin layer that composes them:
//!
//! - **Retry Coordinator** — bounded retries with exponential backoff and
//!   jitter, driven by transient/permanent error classification
//! - **Rate Limiter** — FIFO-fair dispatch pacing so bursts of concurrent
//!   callers never exceed the provider's per-second quota
//! - **Response Cache** — two-tier memoization (fast in-memory, durable
//!   key-value) with per-entry expiration and deterministic key derivation
//! - **Provider Client** — cache → retry → rate-limited dispatch wiring
//!
//! ## Module Organization
//!
//! - [`resilience`] - Retry coordination and rate limiting
//! - [`cache`] - Two-tier response cache and durable store implementations
//! - [`client`] - Composition layer around caller-supplied operations
//! - [`config`] - Validated, environment-aware configuration
//! - [`error`] - Provider error taxonomy with retryability classification
//! - [`logging`] - Structured tracing setup
//! - [`constants`] - Operational defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studyforge_core::cache::{MemoryKvStore, ResponseCache};
//! use studyforge_core::client::ProviderClient;
//! use studyforge_core::error::ApiError;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ApiError> {
//! studyforge_core::logging::init_telemetry();
//!
//! let cache = ResponseCache::new(Arc::new(MemoryKvStore::new()));
//! let client = ProviderClient::with_defaults(cache);
//!
//! let quiz: Vec<String> = client
//!     .execute("quiz", &("volcanoes", 5u32), None, || async {
//!         // hosted-API call goes here
//!         Ok(vec!["What is magma?".to_string()])
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! Everything here is async-cooperative on the tokio runtime; there are no
//! dedicated threads. The retry coordinator sequences attempts of one
//! logical call, the rate limiter orders dispatch across callers, and the
//! cache makes no cross-caller ordering promises (last set wins, concurrent
//! identical misses are not coalesced). None of the components expose
//! cancellation; a queued acquire or in-progress backoff runs to completion.

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod resilience;

pub use cache::{CacheEntry, CacheStats, DurableStore, FileKvStore, MemoryKvStore, ResponseCache};
pub use client::ProviderClient;
pub use config::{CacheSettings, ConfigurationError, CoreConfig, RateLimitConfig};
pub use error::ApiError;
pub use resilience::{
    with_retry, RateLimiter, Retrier, RetryClassification, RetryOptions, RetryPolicy,
};
