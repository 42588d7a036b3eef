//! # Durable Key-Value Stores
//!
//! The cache's durable tier is an opaque string key-value store behind the
//! [`DurableStore`] trait: get, set (fallible, capacity-bounded), remove,
//! and prefix enumeration. Two implementations ship with the crate:
//!
//! - [`MemoryKvStore`] — in-process, capacity-bounded; the test double and
//!   the default when nothing should survive a restart.
//! - [`FileKvStore`] — a single JSON document on disk, loaded at open and
//!   written through on every mutation. Corrupt files are tolerated (the
//!   store starts empty rather than failing).
//!
//! Store errors are never fatal to cache callers; the cache degrades to
//! memory-only behavior.

use crate::config::CacheSettings;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Errors a durable store can raise on write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write would push the store past its byte budget
    #[error("store capacity exceeded ({limit_bytes} bytes)")]
    CapacityExceeded { limit_bytes: usize },

    /// Underlying I/O failure
    #[error("store i/o error: {0}")]
    Io(String),
}

/// Synchronous string key-value store used as the cache's durable tier.
///
/// The cache is the sole mutator of keys under its namespace prefix and
/// never touches keys outside it.
pub trait DurableStore: Send + Sync {
    /// Fetch the raw value for a key, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value; may fail under capacity pressure.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Missing keys are a no-op.
    fn remove(&self, key: &str);

    /// All keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

fn entries_size(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// In-process store with an optional byte budget.
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
    max_bytes: Option<usize>,
}

impl MemoryKvStore {
    /// Unbounded in-process store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_bytes: None,
        }
    }

    /// Store that rejects writes once keys plus values exceed `max_bytes`.
    pub fn with_capacity(max_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_bytes: Some(max_bytes),
        }
    }

    /// Store with the byte budget from [`CacheSettings`].
    pub fn from_settings(settings: &CacheSettings) -> Self {
        match settings.max_durable_bytes {
            Some(limit) => Self::with_capacity(limit),
            None => Self::new(),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if let Some(limit) = self.max_bytes {
            let existing = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let projected = entries_size(&entries) - existing + key.len() + value.len();
            if projected > limit {
                return Err(StoreError::CapacityExceeded { limit_bytes: limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Durable tier persisted as one JSON document on disk.
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
    max_bytes: Option<usize>,
}

impl FileKvStore {
    /// Open (or create) a store at `path`.
    ///
    /// An unreadable or corrupt document is logged and replaced with an
    /// empty store on the next write; persistence is best-effort by design.
    pub fn open(path: impl AsRef<Path>, max_bytes: Option<usize>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "Corrupt store document, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
            max_bytes,
        }
    }

    /// Open a store at `path` with the byte budget from [`CacheSettings`].
    pub fn from_settings(path: impl AsRef<Path>, settings: &CacheSettings) -> Self {
        Self::open(path, settings.max_durable_bytes)
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl DurableStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if let Some(limit) = self.max_bytes {
            let existing = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let projected = entries_size(&entries) - existing + key.len() + value.len();
            if projected > limit {
                return Err(StoreError::CapacityExceeded { limit_bytes: limit });
            }
        }
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(error) = self.persist(&entries) {
            // Roll back so memory and disk stay consistent
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            if let Err(error) = self.persist(&entries) {
                warn!(path = %self.path.display(), %error, "Failed to persist removal");
            }
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}
