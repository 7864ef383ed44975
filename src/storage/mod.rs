//! Durable key-value storage for session state
//!
//! The session store persists two string entries (the serialized session
//! mapping and the active session id). [`KeyValueStore`] is the synchronous
//! seam it writes through; [`SqliteStore`] is the on-disk backend and
//! [`MemoryStore`] backs tests and ephemeral runs.

use crate::error::{CtutorError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod memory;
pub use memory::MemoryStore;

/// Synchronous string-keyed store
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed key-value store
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the store in the user's data directory
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be determined or created,
    /// or the database cannot be initialized.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "ctutor", "ctutor")
            .ok_or_else(|| CtutorError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("store.db"))
    }

    /// Open the store at the specified database path
    ///
    /// Parent directories are created as needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::storage::{KeyValueStore, SqliteStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut store = SqliteStore::new_with_path(dir.path().join("store.db")).unwrap();
    /// store.set("greeting", "hello").unwrap();
    /// assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| CtutorError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        tracing::debug!("Opened session store at {}", store.db_path.display());
        Ok(store)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| CtutorError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| CtutorError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;

        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("Failed to query key")
            .map_err(|e| CtutorError::Storage(e.to_string()))?;

        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .context("Failed to write key")
        .map_err(|e| CtutorError::Storage(e.to_string()))?;

        Ok(())
    }
}
