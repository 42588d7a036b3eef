//! # Two-Tier Response Cache
//!
//! Memoizes the results of deterministic-by-input provider calls behind a
//! fast in-memory tier and a durable, size-constrained tier. Reads check
//! memory first and promote durable hits; writes go to both tiers, with
//! durable failures swallowed (persistence is an optimization, never a
//! contract). Expired entries are never returned and are purged
//! opportunistically.
//!
//! Concurrency: no per-key locking — the last `set` to complete wins, and
//! two simultaneous misses for the same cold key may both invoke the
//! underlying operation. Callers needing at-most-once population must add
//! their own in-flight de-duplication.

use crate::cache::entry::{now_ms, CacheEntry};
use crate::cache::store::DurableStore;
use crate::config::CacheSettings;
use crate::constants::defaults;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Diagnostic counts per tier; no behavioral contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently in the memory tier (including not-yet-swept expired ones)
    pub memory_entries: usize,
    /// Entries under this cache's namespace in the durable tier
    pub durable_entries: usize,
    /// Approximate durable footprint of this namespace, in kilobytes
    pub durable_size_kb: u64,
}

/// Two-tier memoization cache for provider responses.
pub struct ResponseCache {
    namespace: String,
    default_ttl: Duration,
    memory: Mutex<HashMap<String, CacheEntry>>,
    durable: Arc<dyn DurableStore>,
}

impl ResponseCache {
    /// Create a cache over `durable` with the default namespace and TTL.
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self::with_namespace(
            durable,
            defaults::CACHE_NAMESPACE,
            Duration::from_millis(defaults::CACHE_TTL_MS),
        )
    }

    /// Create a cache over `durable` configured from [`CacheSettings`].
    ///
    /// The settings' namespace and default TTL take effect here; the byte
    /// budget belongs to the store and is consumed by the store
    /// constructors (see [`crate::cache::store`]).
    pub fn from_settings(durable: Arc<dyn DurableStore>, settings: &CacheSettings) -> Self {
        Self::with_namespace(
            durable,
            settings.namespace.clone(),
            Duration::from_millis(settings.default_ttl_ms),
        )
    }

    /// Create a cache with an explicit namespace prefix and default TTL.
    ///
    /// Every durable key this cache writes starts with `namespace`; keys
    /// outside it are never read, overwritten, or deleted.
    pub fn with_namespace(
        durable: Arc<dyn DurableStore>,
        namespace: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            memory: Mutex::new(HashMap::new()),
            durable,
        }
    }

    /// The namespace prefix on every durable key this cache owns.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derive the cache key for an operation and its arguments.
    ///
    /// Arguments are serialized through `serde_json::Value`, whose object
    /// maps are ordered, so identical argument tuples always produce
    /// identical keys regardless of construction order.
    pub fn derive_key<A: Serialize + ?Sized>(&self, prefix: &str, args: &A) -> String {
        let serialized = serde_json::to_value(args)
            .and_then(|value| serde_json::to_string(&value))
            .unwrap_or_else(|error| {
                warn!(%error, prefix, "Unserializable cache key arguments");
                "null".to_string()
            });
        format!("{}{}_{}", self.namespace, prefix, serialized)
    }

    /// Fetch a fresh value for `key`, if one exists in either tier.
    ///
    /// Durable hits are promoted into the memory tier; expired durable
    /// copies are deleted as a side effect. Never fails — a durable read
    /// error or an undeserializable payload degrades to a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = now_ms();

        {
            let mut memory = self.memory.lock();
            let expired = match memory.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return serde_json::from_value(entry.data.clone()).ok();
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                memory.remove(key);
            }
        }

        let raw = self.durable.get(key)?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(key, %error, "Unparseable durable cache entry, deleting");
                self.durable.remove(key);
                return None;
            }
        };

        if entry.is_expired(now) {
            self.durable.remove(key);
            return None;
        }

        let value = serde_json::from_value(entry.data.clone()).ok();
        self.memory.lock().insert(key.to_string(), entry);
        value
    }

    /// Write a value to both tiers.
    ///
    /// The memory write always stands. A durable write failure (capacity
    /// pressure, I/O) is swallowed after triggering a cleanup sweep.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(error) => {
                warn!(key, %error, "Unserializable cache value, skipping");
                return;
            }
        };
        let entry = CacheEntry::new(data, ttl.unwrap_or(self.default_ttl));

        self.memory.lock().insert(key.to_string(), entry.clone());

        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(error) = self.durable.set(key, &raw) {
                    warn!(key, %error, "💾 Durable cache write failed, sweeping expired entries");
                    self.cleanup();
                }
            }
            Err(error) => warn!(key, %error, "Failed to serialize cache entry"),
        }
    }

    /// Memoize an asynchronous operation keyed by `key_prefix` plus its
    /// serialized arguments.
    ///
    /// On a hit the cached value is returned without invoking `fetch`. On a
    /// miss, `fetch` runs, its result is stored under the derived key, and
    /// the value is returned. Only `fetch`'s own error ever propagates.
    pub async fn get_or_fetch<A, T, E, F, Fut>(
        &self,
        key_prefix: &str,
        args: &A,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.derive_key(key_prefix, args);

        if let Some(hit) = self.get::<T>(&key) {
            debug!(prefix = key_prefix, "🎯 Cache hit");
            return Ok(hit);
        }
        debug!(prefix = key_prefix, "📭 Cache miss");

        let value = fetch().await?;
        self.set(&key, &value, ttl);
        Ok(value)
    }

    /// Remove an entry from both tiers. Idempotent.
    pub fn invalidate(&self, key: &str) {
        self.memory.lock().remove(key);
        self.durable.remove(key);
    }

    /// Remove every entry this cache owns from both tiers.
    ///
    /// Durable keys outside the namespace are untouched.
    pub fn clear(&self) {
        self.memory.lock().clear();
        for key in self.durable.keys_with_prefix(&self.namespace) {
            self.durable.remove(&key);
        }
    }

    /// Evict expired (and unparseable) entries from both tiers.
    ///
    /// Run once by the owning process at startup, and reactively whenever a
    /// durable write fails.
    pub fn cleanup(&self) {
        let now = now_ms();

        self.memory.lock().retain(|_, entry| !entry.is_expired(now));

        let mut evicted = 0usize;
        for key in self.durable.keys_with_prefix(&self.namespace) {
            let stale = match self.durable.get(&key) {
                Some(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => entry.is_expired(now),
                    Err(_) => true,
                },
                None => false,
            };
            if stale {
                self.durable.remove(&key);
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, "🧹 Swept expired durable cache entries");
        }
    }

    /// Entry counts and approximate durable footprint, for diagnostics.
    pub fn stats(&self) -> CacheStats {
        let keys = self.durable.keys_with_prefix(&self.namespace);
        let total_bytes: usize = keys
            .iter()
            .filter_map(|key| self.durable.get(key))
            .map(|raw| raw.len())
            .sum();

        CacheStats {
            memory_entries: self.memory.lock().len(),
            durable_entries: keys.len(),
            durable_size_kb: (total_bytes / 1024) as u64,
        }
    }
}
