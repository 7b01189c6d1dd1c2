//! Fail-soft JSON document access on top of a [`KvBackend`].
//!
//! This is the only persistence API the entity stores use. Reads fall back to
//! a caller-supplied default and writes are dropped on error; both cases are
//! logged, neither is reported to the caller.

use std::sync::{Arc, Mutex};

use nexa_shared::constants::STORAGE_NAMESPACE;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::kv::{KvBackend, MemoryBackend};

/// The persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Users,
    CurrentUser,
    Conversations,
    Messages,
    Tasks,
    Deals,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::Users,
        StorageKey::CurrentUser,
        StorageKey::Conversations,
        StorageKey::Messages,
        StorageKey::Tasks,
        StorageKey::Deals,
    ];

    fn suffix(self) -> &'static str {
        match self {
            StorageKey::Users => "users",
            StorageKey::CurrentUser => "current_user",
            StorageKey::Conversations => "conversations",
            StorageKey::Messages => "messages",
            StorageKey::Tasks => "tasks",
            StorageKey::Deals => "deals",
        }
    }

    /// Full backend key, e.g. `nexa_users`.
    pub fn as_key(self) -> String {
        format!("{STORAGE_NAMESPACE}_{}", self.suffix())
    }
}

/// Cheaply clonable handle to the shared backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KvBackend>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Storage backed by an open SQLite database.
    pub fn sqlite(db: Database) -> Self {
        Self::new(Arc::new(Mutex::new(db)))
    }

    /// Storage that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Read and decode the document under `key`, or return `default` when it
    /// is absent or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: StorageKey, default: T) -> T {
        let key = key.as_key();
        let raw = match self.backend.read(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "failed to read stored document");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "stored document is not valid JSON for its type");
                default
            }
        }
    }

    /// Encode and write `value` under `key`. Errors are logged and dropped.
    pub fn set<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) {
        let key = key.as_key();
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "failed to serialize document");
                return;
            }
        };

        if let Err(e) = self.backend.write(&key, &json) {
            tracing::error!(key = %key, error = %e, "failed to write document");
        }
    }

    /// Drop the document under `key`. Errors are logged and dropped.
    pub fn remove(&self, key: StorageKey) {
        let key = key.as_key();
        if let Err(e) = self.backend.delete(&key) {
            tracing::error!(key = %key, error = %e, "failed to remove document");
        }
    }

    /// Raw JSON stored under `key`, for diagnostics and tests.
    pub fn raw(&self, key: StorageKey) -> Option<String> {
        self.backend.read(&key.as_key()).ok().flatten()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
