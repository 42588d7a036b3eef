//! # Response Cache
//!
//! Two-tier memoization for deterministic-by-input provider calls: a fast
//! in-memory map backed by a durable, namespaced, size-constrained key-value
//! store. Durable-tier failures never reach callers — persistence is a
//! best-effort enhancement on top of memory-only caching.

pub mod entry;
pub mod response_cache;
pub mod store;

pub use entry::CacheEntry;
pub use response_cache::{CacheStats, ResponseCache};
pub use store::{DurableStore, FileKvStore, MemoryKvStore, StoreError};
