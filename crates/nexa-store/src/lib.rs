//! # nexa-store
//!
//! Persistence layer for the Nexa CRM: an opaque key-value store holding one
//! JSON document per collection, the typed entity models that live in those
//! documents, and the seed generator that fills an empty store with sample
//! data.
//!
//! The default backend is a single SQLite table behind a synchronous
//! [`Database`] handle; [`MemoryBackend`] is a drop-in for tests.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod models;
pub mod patches;
pub mod seed;
pub mod storage;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::{KvBackend, MemoryBackend};
pub use models::*;
pub use patches::*;
pub use storage::{Storage, StorageKey};
