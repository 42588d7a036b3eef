//! # System Constants
//!
//! Operational defaults shared across the crate. Configuration (see
//! [`crate::config`]) can override every value here; these are the fallbacks
//! the original client shipped with.

/// Default values for retry, pacing, and caching behavior
pub mod defaults {
    /// Namespace prefix for every durable cache key this crate owns.
    ///
    /// The durable store is a shared key space; the cache must never touch
    /// keys outside this prefix.
    pub const CACHE_NAMESPACE: &str = "studyforge_cache_";

    /// Default cache entry time-to-live: 30 minutes
    pub const CACHE_TTL_MS: u64 = 30 * 60 * 1000;

    /// Default provider dispatch rate
    pub const CALLS_PER_SECOND: u32 = 2;

    /// Default maximum retry attempts beyond the first call
    pub const MAX_RETRIES: u32 = 3;

    /// Default base delay for exponential backoff
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Default cap on any single backoff delay
    pub const MAX_DELAY_MS: u64 = 30_000;

    /// Default exponential growth factor between attempts
    pub const BACKOFF_FACTOR: f64 = 2.0;

    /// Fraction of the exponential delay used as the jitter window
    pub const JITTER_RATIO: f64 = 0.3;
}
