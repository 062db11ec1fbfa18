//! Key-value store trait and SQLite implementation.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Error from the persistent store.
///
/// Kept separate from cache misses: `Ok(None)` means "nothing stored",
/// `Err` means the store itself misbehaved. The request pipeline logs the
/// latter and carries on, but observability code can tell them apart.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("store backend error: {0}")]
  Backend(String),
}

impl From<rusqlite::Error> for StoreError {
  fn from(e: rusqlite::Error) -> Self {
    StoreError::Backend(e.to_string())
  }
}

/// Durable key -> string mapping shared process-wide.
///
/// Every write is a blind overwrite; there is no read-modify-write, so
/// concurrent writers to the same key race benignly (last write wins).
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Write `value` under `key`, replacing any existing value.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Delete the given keys. Keys that are absent are not an error.
  fn remove(&self, keys: &[String]) -> Result<(), StoreError>;

  /// List every key currently stored.
  fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// SQLite-backed store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for the store table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open_default() -> Result<Self, StoreError> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)
      .map_err(|e| StoreError::Backend(format!("failed to open store at {}: {}", path.display(), e)))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StoreError::Backend("could not determine data directory".to_string()))?;

    Ok(data_dir.join("quranquest").join("offline.db"))
  }

  /// Run database migrations for the store table.
  fn run_migrations(&self) -> Result<(), StoreError> {
    let conn = self.lock()?;
    conn.execute_batch(STORE_SCHEMA)?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.lock()?;

    let value = conn
      .query_row("SELECT value FROM kv_store WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()?;

    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = self.lock()?;

    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, written_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;

    Ok(())
  }

  fn remove(&self, keys: &[String]) -> Result<(), StoreError> {
    let conn = self.lock()?;

    conn.execute("BEGIN TRANSACTION", [])?;
    for key in keys {
      conn.execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
    }
    conn.execute("COMMIT", [])?;

    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    let conn = self.lock()?;

    let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
    let keys = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;

    Ok(keys)
  }
}

/// In-memory store for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
    self
      .entries
      .lock()
      .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self.lock()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, keys: &[String]) -> Result<(), StoreError> {
    let mut entries = self.lock()?;
    for key in keys {
      entries.remove(key);
    }
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.lock()?.keys().cloned().collect())
  }
}
