use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::storage::Storage;

/// Namespace prefix for cache keys in the shared storage. Keeps cache
/// entries disjoint from the operation queue and the sync marker.
const CACHE_PREFIX: &str = "starships_cache_";

/// Entries older than this are treated as absent on read (5 minutes).
/// Short enough that reads never serve data staler than one editing
/// session, long enough to ride out a connectivity blip.
const CACHE_EXPIRATION_MS: i64 = 5 * 60 * 1000;

/// The stored envelope: payload plus creation time in epoch millis.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    timestamp: i64,
}

/// Timestamped snapshot cache over the storage port.
///
/// Last-write-wins with no versioning. Corrupted entries and unavailable
/// storage read as cache misses, never as errors.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, key)
    }

    /// Store `data` under `key` with the current timestamp, overwriting any
    /// prior entry unconditionally.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to serialize cache payload");
                return;
            }
        };
        let entry = CacheEntry {
            data,
            timestamp: Utc::now().timestamp_millis(),
        };
        match serde_json::to_string(&entry) {
            Ok(contents) => self.storage.set(&Self::storage_key(key), &contents),
            Err(e) => debug!(key = %key, error = %e, "Failed to serialize cache entry"),
        }
    }

    /// Read the entry under `key`. Returns `None` when the entry is absent,
    /// unparseable, of the wrong shape, or older than the expiration
    /// window; expired entries are evicted on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(&Self::storage_key(key))?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %key, error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        let age_ms = Utc::now().timestamp_millis() - entry.timestamp;
        if age_ms > CACHE_EXPIRATION_MS {
            debug!(key = %key, age_ms, "Cache entry expired, evicting");
            self.remove(key);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key = %key, error = %e, "Cache payload has unexpected shape");
                None
            }
        }
    }

    /// Delete the entry under `key`. No-op if absent.
    pub fn remove(&self, key: &str) {
        self.storage.remove(&Self::storage_key(key));
    }

    /// Delete every entry under the cache namespace. Keys outside the
    /// namespace (queue, sync marker) are untouched.
    pub fn clear_all(&self) {
        for key in self.storage.keys() {
            if key.starts_with(CACHE_PREFIX) {
                self.storage.remove(&key);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, CacheStore) {
        let storage = Arc::new(MemoryStorage::new());
        let cache = CacheStore::new(storage.clone());
        (storage, cache)
    }

    #[test]
    fn test_round_trip() {
        let (_, cache) = store();
        cache.set("all_starships", &vec!["a".to_string(), "b".to_string()]);
        let got: Option<Vec<String>> = cache.get("all_starships");
        assert_eq!(got, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let (storage, cache) = store();
        cache.set("k", &1);
        cache.set("k", &1);
        assert_eq!(cache.get::<i32>("k"), Some(1));
        // A single namespaced entry, not an accumulation
        assert_eq!(storage.keys().len(), 1);
    }

    #[test]
    fn test_expired_entry_reads_absent_and_is_evicted() {
        let (storage, cache) = store();
        let stale = CacheEntry {
            data: serde_json::json!(["old"]),
            timestamp: Utc::now().timestamp_millis() - CACHE_EXPIRATION_MS - 1,
        };
        storage.set(
            "starships_cache_all_starships",
            &serde_json::to_string(&stale).unwrap(),
        );

        let got: Option<Vec<String>> = cache.get("all_starships");
        assert_eq!(got, None);
        // Evicted on access, not just hidden
        assert_eq!(storage.get("starships_cache_all_starships"), None);
    }

    #[test]
    fn test_fresh_entry_within_window_survives() {
        let (storage, cache) = store();
        let fresh = CacheEntry {
            data: serde_json::json!(["new"]),
            timestamp: Utc::now().timestamp_millis() - (CACHE_EXPIRATION_MS / 2),
        };
        storage.set(
            "starships_cache_k",
            &serde_json::to_string(&fresh).unwrap(),
        );
        assert_eq!(cache.get::<Vec<String>>("k"), Some(vec!["new".to_string()]));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let (storage, cache) = store();
        storage.set("starships_cache_bad", "{not json");
        assert_eq!(cache.get::<Vec<String>>("bad"), None);
    }

    #[test]
    fn test_clear_all_spares_foreign_keys() {
        let (storage, cache) = store();
        cache.set("a", &1);
        cache.set("b", &2);
        storage.set("starships_offline_queue", "[]");

        cache.clear_all();

        assert_eq!(cache.get::<i32>("a"), None);
        assert_eq!(cache.get::<i32>("b"), None);
        assert_eq!(storage.get("starships_offline_queue").as_deref(), Some("[]"));
    }
}
