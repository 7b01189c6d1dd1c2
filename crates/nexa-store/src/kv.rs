//! Raw key-value access.
//!
//! A [`KvBackend`] stores opaque strings (JSON documents in practice) under
//! string keys. There are no transactions across keys.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Byte-level key-value storage shared between the entity stores.
pub trait KvBackend: Send + Sync {
    /// Fetch the value stored under `key`, `None` if absent.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

impl Database {
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Returns `true` if a row was deleted.
    pub fn kv_delete(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }
}

// rusqlite::Connection is not Sync, so the shared handle goes through a mutex.
impl KvBackend for Mutex<Database> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.lock().map_err(|_| StoreError::LockPoisoned)?.kv_get(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .kv_set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .kv_delete(key)
            .map(|_| ())
    }
}

/// Volatile in-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}
