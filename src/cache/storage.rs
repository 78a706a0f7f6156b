//! Durable key-value storage backends and the snapshot store built on them.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use super::keys::Scope;
use super::snapshot::CacheSnapshot;

/// String-valued durable storage, one value per key.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage implementation that doesn't keep anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl KeyValueStore for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }
}

/// Process-local storage, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Storage picked at startup: SQLite on disk, or nothing when caching is
/// disabled or the database cannot be opened.
pub enum Backend {
  Sqlite(SqliteStorage),
  Noop(NoopStorage),
}

impl Backend {
  /// Open the default on-disk storage when `enabled`.
  pub fn open(enabled: bool) -> Self {
    Self::open_with(enabled, SqliteStorage::open)
  }

  /// Like [`Backend::open`], with the SQLite opener supplied by the caller.
  ///
  /// An opener failure is logged and degrades to [`NoopStorage`].
  pub fn open_with<F>(enabled: bool, open: F) -> Self
  where
    F: FnOnce() -> Result<SqliteStorage>,
  {
    if !enabled {
      return Backend::Noop(NoopStorage);
    }

    match open() {
      Ok(storage) => Backend::Sqlite(storage),
      Err(e) => {
        warn!(error = %e, "cache storage unavailable, continuing without a cache");
        Backend::Noop(NoopStorage)
      }
    }
  }

  pub fn is_persistent(&self) -> bool {
    matches!(self, Backend::Sqlite(_))
  }
}

impl KeyValueStore for Backend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    match self {
      Backend::Sqlite(storage) => storage.get(key),
      Backend::Noop(storage) => storage.get(key),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    match self {
      Backend::Sqlite(storage) => storage.set(key, value),
      Backend::Noop(storage) => storage.set(key, value),
    }
  }
}

/// SQLite-based key-value storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Create a storage that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("coachmarks").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache key {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write cache key {}: {}", key, e))?;

    Ok(())
  }
}

/// Reads and writes [`CacheSnapshot`]s, one per scope.
///
/// Neither operation fails: unreadable data loads as an empty snapshot and
/// failed writes are logged and dropped.
pub struct SnapshotStore<S: KeyValueStore> {
  storage: S,
  /// Held for the whole load-change-save of [`SnapshotStore::modify`]
  write_lock: Mutex<()>,
}

impl<S: KeyValueStore> SnapshotStore<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage,
      write_lock: Mutex::new(()),
    }
  }

  /// Load the snapshot for `scope`, apply `change` and save the result.
  ///
  /// Concurrent calls are serialized so no update is lost between another
  /// caller's load and save.
  pub fn modify<F>(&self, scope: &Scope, change: F) -> CacheSnapshot
  where
    F: FnOnce(&mut CacheSnapshot),
  {
    let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut snapshot = self.load(scope);
    change(&mut snapshot);
    self.save(scope, &snapshot);
    snapshot
  }

  pub fn load(&self, scope: &Scope) -> CacheSnapshot {
    let key = scope.storage_key();

    let raw = match self.storage.get(&key) {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        debug!(scope = %scope.id, "no cached snapshot");
        return CacheSnapshot::default();
      }
      Err(e) => {
        warn!(scope = %scope.id, error = %e, "failed to read cached snapshot");
        return CacheSnapshot::default();
      }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
      warn!(scope = %scope.id, error = %e, "discarding unreadable cached snapshot");
      CacheSnapshot::default()
    })
  }

  pub fn save(&self, scope: &Scope, snapshot: &CacheSnapshot) {
    let raw = match serde_json::to_string(snapshot) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(scope = %scope.id, error = %e, "failed to serialize snapshot");
        return;
      }
    };

    if let Err(e) = self.storage.set(&scope.storage_key(), &raw) {
      warn!(scope = %scope.id, error = %e, "failed to persist snapshot");
    }
  }
}
