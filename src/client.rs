//! # Provider Client
//!
//! Thin composition layer stringing the three utilities together around an
//! external call: cache outermost (hits skip everything), retry around the
//! rate-limited dispatch (each attempt is paced like any other call).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use studyforge_core::cache::MemoryKvStore;
//! use studyforge_core::client::ProviderClient;
//! use studyforge_core::config::CoreConfig;
//! use studyforge_core::error::ApiError;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ApiError> {
//! let config = CoreConfig::load().expect("invalid configuration");
//! let store = Arc::new(MemoryKvStore::from_settings(&config.cache));
//! let client = ProviderClient::from_config(store, &config);
//!
//! let summary: String = client
//!     .execute("lesson_summary", &("photosynthesis", "grade-8"), None, || async {
//!         // call the hosted generation API here
//!         Ok("The leaf is a solar panel...".to_string())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::cache::{DurableStore, ResponseCache};
use crate::config::CoreConfig;
use crate::error::ApiError;
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::retry::{with_retry, RetryOptions, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Cached, rate-limited, retried wrapper around caller-supplied provider
/// operations.
pub struct ProviderClient {
    cache: ResponseCache,
    limiter: RateLimiter,
    retry: RetryOptions<ApiError>,
}

impl ProviderClient {
    /// Assemble a client from its parts.
    ///
    /// Runs the one startup cleanup pass over the cache, as the owner of the
    /// cache instance.
    pub fn new(cache: ResponseCache, limiter: RateLimiter, retry: RetryOptions<ApiError>) -> Self {
        cache.cleanup();
        info!(
            namespace = cache.namespace(),
            min_interval_ms = limiter.min_interval().as_millis() as u64,
            max_retries = retry.policy.max_retries,
            "🚀 Provider client initialized"
        );
        Self {
            cache,
            limiter,
            retry,
        }
    }

    /// Assemble a client from configuration.
    ///
    /// Every section of the config takes effect: the cache is built over
    /// `durable` with the configured namespace and default TTL, the limiter
    /// with the configured rate, and retries with the configured policy.
    pub fn from_config(durable: Arc<dyn DurableStore>, config: &CoreConfig) -> Self {
        let cache = ResponseCache::from_settings(durable, &config.cache);
        let limiter = RateLimiter::new("provider", config.rate_limit.calls_per_second);
        let retry = RetryOptions::new(config.retry.clone());
        Self::new(cache, limiter, retry)
    }

    /// Assemble a client with default policy everywhere.
    pub fn with_defaults(cache: ResponseCache) -> Self {
        Self::new(
            cache,
            RateLimiter::new("provider", crate::constants::defaults::CALLS_PER_SECOND),
            RetryOptions::new(RetryPolicy::default()),
        )
    }

    /// Execute `call` through the full pipeline.
    ///
    /// Cache hit: returns immediately, consuming no rate-limit slot. Cache
    /// miss: dispatches `call` under the rate limiter, retrying transient
    /// failures with backoff; the eventual value is cached under a key
    /// derived from `operation` and `args`.
    pub async fn execute<A, T, F, Fut>(
        &self,
        operation: &str,
        args: &A,
        ttl: Option<Duration>,
        call: F,
    ) -> Result<T, ApiError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.cache
            .get_or_fetch(operation, args, ttl, || async {
                with_retry(|| self.limiter.call(&call), &self.retry).await
            })
            .await
    }

    /// The cache this client owns.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// The shared rate limiter handle.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKvStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_client() -> ProviderClient {
        let cache = ResponseCache::with_namespace(
            Arc::new(MemoryKvStore::new()),
            "sf_client_",
            Duration::from_secs(60),
        );
        let limiter = RateLimiter::with_min_interval("test", Duration::from_millis(10));
        let retry = RetryOptions::new(RetryPolicy {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
            backoff_factor: 2.0,
        });
        ProviderClient::new(cache, limiter, retry)
    }

    #[tokio::test]
    async fn from_config_wires_every_section() {
        let store = Arc::new(MemoryKvStore::new());
        let mut config = crate::config::CoreConfig::default();
        config.cache.namespace = "sf_cfg_client_".to_string();
        config.cache.default_ttl_ms = 20;
        config.rate_limit.calls_per_second = 50;
        config.retry.max_retries = 1;
        config.retry.base_delay_ms = 10;
        config.retry.max_delay_ms = 100;

        let client = ProviderClient::from_config(store.clone(), &config);
        assert_eq!(client.limiter().min_interval(), Duration::from_millis(20));

        let calls = AtomicU32::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ApiError>("answer".to_string()) }
        };

        client.execute("summary", "topic", None, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Durable keys carry the configured namespace
        assert_eq!(store.keys_with_prefix("sf_cfg_client_").len(), 1);

        // The configured default TTL governs expiry: after it lapses the
        // same request reaches the provider again
        tokio::time::sleep(Duration::from_millis(40)).await;
        client.execute("summary", "topic", None, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pipeline_retries_then_caches() {
        let client = fast_client();
        let calls = AtomicU32::new(0);

        let flaky = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::Server { status: 503 })
                } else {
                    Ok("lesson".to_string())
                }
            }
        };

        let first = client
            .execute("summary", "photosynthesis", None, flaky)
            .await
            .unwrap();
        assert_eq!(first, "lesson");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second identical request is a cache hit: no further provider calls
        let second: String = client
            .execute("summary", "photosynthesis", None, flaky)
            .await
            .unwrap();
        assert_eq!(second, "lesson");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_propagates_uncached() {
        let client = fast_client();
        let calls = AtomicU32::new(0);

        let broken = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(ApiError::Client { status: 400 }) }
        };

        let result = client.execute("summary", "bad topic", None, broken).await;
        assert_eq!(result, Err(ApiError::Client { status: 400 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The failure was not cached: a retry reaches the provider again
        let _ = client.execute("summary", "bad topic", None, broken).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
