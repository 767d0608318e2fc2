// Timestamped JSON file cache for external fetches (ADP, roster, stats).
//
// One JSON document per cache file, shaped `{ key: { data, timestamp } }`.
// Every update rewrites the whole file; there is no locking against
// concurrent writers.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    timestamp: DateTime<Utc>,
}

/// Handle to one cache file on disk. Cheap to construct; every call reads
/// the file afresh.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file `name` inside `dir`.
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached payload for `key` if it was written less than `ttl` ago.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<Value> {
        self.get_fresh_at(key, ttl, Utc::now())
    }

    pub fn get_fresh_at(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Option<Value> {
        let entry = self.read_all().remove(key)?;
        if now.signed_duration_since(entry.timestamp) < ttl {
            debug!(key, path = %self.path.display(), "cache hit");
            Some(entry.data)
        } else {
            debug!(key, path = %self.path.display(), "cache entry expired");
            None
        }
    }

    /// Cached payload for `key` regardless of age, with its timestamp.
    /// Used as the fail-soft fallback when a refresh fails.
    pub fn get_stale(&self, key: &str) -> Option<(Value, DateTime<Utc>)> {
        self.read_all()
            .remove(key)
            .map(|entry| (entry.data, entry.timestamp))
    }

    /// Typed variant of `get_fresh`. A payload that no longer deserializes is
    /// treated as a miss.
    pub fn get_fresh_as<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let value = self.get_fresh(key, ttl)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, "cached payload has unexpected shape: {e}");
                None
            }
        }
    }

    /// Store `data` under `key` stamped with the current time, overwriting any
    /// previous entry.
    pub fn put(&self, key: &str, data: &Value) -> Result<(), CacheError> {
        self.put_at(key, data, Utc::now())
    }

    pub fn put_at(&self, key: &str, data: &Value, now: DateTime<Utc>) -> Result<(), CacheError> {
        let mut all = self.read_all();
        all.insert(
            key.to_string(),
            CacheEntry {
                data: data.clone(),
                timestamp: now,
            },
        );

        let text = serde_json::to_string_pretty(&all)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Write {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }
        std::fs::write(&self.path, text).map_err(|e| CacheError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(key, path = %self.path.display(), "cache updated");
        Ok(())
    }

    /// Missing or unreadable files read as empty; a corrupt file is logged
    /// and will be replaced on the next `put`.
    fn read_all(&self) -> BTreeMap<String, CacheEntry> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring corrupt cache file: {e}");
                BTreeMap::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn scratch(name: &str) -> (PathBuf, FileCache) {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        let cache = FileCache::in_dir(&dir, "cache.json");
        (dir, cache)
    }

    #[test]
    fn fresh_entry_is_returned_within_ttl() {
        let (dir, cache) = scratch("gridiron_cache_fresh");
        let now = Utc::now();
        cache.put_at("ppr_12_2025", &json!([1, 2, 3]), now).unwrap();

        let hit = cache.get_fresh_at("ppr_12_2025", Duration::hours(6), now + Duration::hours(5));
        assert_eq!(hit, Some(json!([1, 2, 3])));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn expired_entry_is_a_miss_but_stale_read_survives() {
        let (dir, cache) = scratch("gridiron_cache_expired");
        let then = Utc::now() - Duration::hours(25);
        cache.put_at("roster", &json!({"count": 2}), then).unwrap();

        assert!(cache.get_fresh("roster", Duration::hours(24)).is_none());
        let (stale, ts) = cache.get_stale("roster").unwrap();
        assert_eq!(stale["count"], 2);
        assert_eq!(ts, then);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn put_overwrites_and_keeps_other_keys() {
        let (dir, cache) = scratch("gridiron_cache_overwrite");
        cache.put("a", &json!(1)).unwrap();
        cache.put("b", &json!(2)).unwrap();
        cache.put("a", &json!(3)).unwrap();

        assert_eq!(cache.get_fresh("a", Duration::hours(1)), Some(json!(3)));
        assert_eq!(cache.get_fresh("b", Duration::hours(1)), Some(json!(2)));

        let raw: Value = serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert!(raw["a"]["timestamp"].is_string());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let (dir, cache) = scratch("gridiron_cache_corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(cache.path(), "not json").unwrap();

        assert!(cache.get_stale("anything").is_none());
        cache.put("k", &json!("v")).unwrap();
        assert_eq!(cache.get_fresh("k", Duration::hours(1)), Some(json!("v")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn typed_read_treats_shape_mismatch_as_miss() {
        let (dir, cache) = scratch("gridiron_cache_typed");
        cache.put("k", &json!({"not": "a list"})).unwrap();
        let typed: Option<Vec<String>> = cache.get_fresh_as("k", Duration::hours(1));
        assert!(typed.is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
