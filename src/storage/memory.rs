//! In-process key-value store

use super::KeyValueStore;
use crate::error::Result;
use std::collections::HashMap;

/// Key-value store that lives only as long as the process
///
/// Clones share nothing; seed one with [`MemoryStore::with_entry`] to
/// simulate previously persisted state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::storage::{KeyValueStore, MemoryStore};
    ///
    /// let store = MemoryStore::new().with_entry("k", "v");
    /// assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    /// ```
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
