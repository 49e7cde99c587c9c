//! Key/value persistence for ratings, history, bot state and results.
//!
//! The arena persists everything through the [`Store`] contract: JSON values
//! addressed by hierarchical, slash-separated paths such as
//! `ratings/match/minimax`. [`SqliteStore`] is the production backend;
//! [`MemoryStore`] backs tests and dry runs.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while reading or writing the store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The SQLite backend failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value could not be (de)serialized.
    #[error("serialization error at {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// A previous holder of the connection lock panicked.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Hierarchical key/value persistence.
pub trait Store: Send + Sync {
    /// Reads the value at `path`, or `None` if nothing was saved there.
    fn load_value(&self, path: &str) -> Result<Option<Value>, StorageError>;

    /// Writes `value` at `path`, replacing any previous value.
    fn save_value(&self, path: &str, value: Value) -> Result<(), StorageError>;

    /// Writes several values so that either all or none become visible.
    fn save_batch(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError>;

    /// Returns true if a value exists at `path`.
    fn contains(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.load_value(path)?.is_some())
    }
}

/// Typed helpers available on every [`Store`].
pub trait StoreExt: Store {
    /// Loads and deserializes the value at `path`, or returns `default`.
    fn load<T: DeserializeOwned>(&self, path: &str, default: T) -> Result<T, StorageError> {
        match self.load_value(path)? {
            Some(value) => serde_json::from_value(value).map_err(|source| StorageError::Serde {
                path: path.to_string(),
                source,
            }),
            None => Ok(default),
        }
    }

    /// Loads the value at `path` if there is one.
    fn load_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StorageError> {
        self.load_value(path)?
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StorageError::Serde {
                    path: path.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Serializes and saves `value` at `path`.
    fn save<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<(), StorageError> {
        self.save_value(path, to_value(path, value)?)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Serializes a value for storage at `path`.
pub fn to_value<T: Serialize + ?Sized>(path: &str, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|source| StorageError::Serde {
        path: path.to_string(),
        source,
    })
}

/// SQLite-backed store.
///
/// All values live in a single `kv` table keyed by path. The connection is
/// guarded by a mutex so the store can be shared with the compute thread.
///
/// # Example
///
/// ```
/// use bot_arena::storage::{SqliteStore, StoreExt};
///
/// let store = SqliteStore::open(":memory:").unwrap();
/// store.save("ratings/match/random", &812.5).unwrap();
/// assert_eq!(store.load("ratings/match/random", 800.0).unwrap(), 812.5);
/// assert_eq!(store.load("ratings/match/other", 800.0).unwrap(), 800.0);
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a database at the given path.
    ///
    /// Use `:memory:` for a throwaway database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or if schema
    /// initialization fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                path TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

const UPSERT: &str = "INSERT INTO kv (path, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(path) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

impl Store for SqliteStore {
    fn load_value(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StorageError::Serde {
                path: path.to_string(),
                source,
            })
        })
        .transpose()
    }

    fn save_value(&self, path: &str, value: Value) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            UPSERT,
            (path, value.to_string(), Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    fn save_batch(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for (path, value) in entries {
            tx.execute(UPSERT, (path, value.to_string(), &now))?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored paths.
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn load_value(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(path).cloned())
    }

    fn save_value(&self, path: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(path.to_string(), value);
        Ok(())
    }

    fn save_batch(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.extend(entries);
        Ok(())
    }
}
