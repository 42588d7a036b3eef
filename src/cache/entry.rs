//! Cache entry shape shared by both tiers.
//!
//! Serialized camelCase (`{ data, timestamp, expiresIn }`) — this is the
//! persisted schema in the durable store, so the field names are load-bearing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A memoized value plus its validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The memoized result, already JSON-shaped
    pub data: Value,
    /// Write time, epoch milliseconds
    pub timestamp: i64,
    /// Validity window in milliseconds from `timestamp`
    pub expires_in: u64,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn new(data: Value, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
            expires_in: ttl.as_millis() as u64,
        }
    }

    /// An entry is valid iff `now < timestamp + expires_in`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.timestamp + self.expires_in as i64
    }
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
