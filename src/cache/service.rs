//! Expiring cache entries on top of the key-value store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::keys;
use super::store::{KeyValueStore, StoreError};

/// Stored representation of a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
  value: Value,
  stored_at: DateTime<Utc>,
  ttl_secs: i64,
}

impl CacheEntry {
  fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    now - self.stored_at < Duration::seconds(self.ttl_secs)
  }
}

/// Expiring cache over a [`KeyValueStore`].
///
/// Entries are JSON records carrying the value, the write instant and the
/// TTL. A stale entry is never surfaced; it sits inert until overwritten
/// or cleared.
#[derive(Clone)]
pub struct OfflineCache {
  store: Arc<dyn KeyValueStore>,
}

impl OfflineCache {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// The underlying store, for collaborators that keep non-cache keys
  /// (auth tokens) in the same device.
  pub fn store(&self) -> Arc<dyn KeyValueStore> {
    self.store.clone()
  }

  /// Store `value` under `key`, overwriting any existing entry.
  pub fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), StoreError> {
    let entry = CacheEntry {
      value: value.clone(),
      stored_at: Utc::now(),
      ttl_secs: ttl.num_seconds(),
    };
    let encoded = serde_json::to_string(&entry)
      .map_err(|e| StoreError::Backend(format!("failed to encode cache entry: {}", e)))?;

    self.store.set(key, &encoded)
  }

  /// Read the value under `key` if present and fresh.
  ///
  /// Missing, malformed and expired entries all read as `None`; a
  /// malformed entry is a miss, not an error.
  pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
    let Some(raw) = self.store.get(key)? else {
      return Ok(None);
    };

    let entry: CacheEntry = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        debug!(key, error = %e, "discarding malformed cache entry");
        return Ok(None);
      }
    };

    if !entry.is_fresh(Utc::now()) {
      debug!(key, "cache entry is stale");
      return Ok(None);
    }

    Ok(Some(entry.value))
  }

  /// Delete every key sharing `prefix`. Returns how many were removed.
  pub fn remove_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
    let matching: Vec<String> = self
      .store
      .keys()?
      .into_iter()
      .filter(|k| k.starts_with(prefix))
      .collect();

    if matching.is_empty() {
      return Ok(0);
    }

    self.store.remove(&matching)?;
    Ok(matching.len())
  }

  /// Delete every entry across the managed namespaces, plus the bootstrap
  /// flag so a wiped installation re-runs its seeding. Auth/session keys
  /// are untouched.
  pub fn clear_all(&self) -> Result<usize, StoreError> {
    let matching: Vec<String> = self
      .store
      .keys()?
      .into_iter()
      .filter(|k| {
        keys::MANAGED_PREFIXES.iter().any(|p| k.starts_with(p)) || k == keys::BOOTSTRAP_FLAG_KEY
      })
      .collect();

    if matching.is_empty() {
      return Ok(0);
    }

    self.store.remove(&matching)?;
    Ok(matching.len())
  }

  /// Number of entries currently stored in the managed namespaces.
  pub fn managed_entry_count(&self) -> Result<usize, StoreError> {
    let count = self
      .store
      .keys()?
      .iter()
      .filter(|k| keys::MANAGED_PREFIXES.iter().any(|p| k.starts_with(p)))
      .count();

    Ok(count)
  }

  /// Whether the one-time bootstrap has completed.
  pub fn is_initialized(&self) -> Result<bool, StoreError> {
    Ok(self.store.get(keys::BOOTSTRAP_FLAG_KEY)?.is_some())
  }

  /// Record that bootstrap completed.
  pub fn mark_initialized(&self) -> Result<(), StoreError> {
    self.store.set(keys::BOOTSTRAP_FLAG_KEY, "true")
  }
}
