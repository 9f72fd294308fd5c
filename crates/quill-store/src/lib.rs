//! # Quill Store
//!
//! Storage abstraction for collection keys and collection records.
//!
//! Two backends implement the [`KeyStore`] and [`CollectionStore`] traits:
//!
//! - [`SqliteStore`] - the primary backend, rusqlite with bundled SQLite
//! - [`MemoryStore`] - in-memory, for tests
//!
//! The key store persists exactly one key per collection id; the consistency
//! policy (no silent overwrite) is enforced by the keyring cache above this
//! layer, not by the store itself.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CollectionStore, KeyStore};
