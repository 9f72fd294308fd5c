//! Store traits: the abstract interfaces for key and collection persistence.
//!
//! These traits allow the services above to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::collections::HashMap;

use async_trait::async_trait;
use quill_core::{Collection, CollectionId, CollectionKey};

use crate::error::Result;

/// Durable persistence of one encryption key per collection id.
///
/// The store layer is a dumb map: `put` overwrites. The no-silent-overwrite
/// policy for collection keys belongs to the keyring cache, which checks the
/// stored value before writing.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Get the key for a collection, if present.
    async fn get(&self, id: &CollectionId) -> Result<Option<CollectionKey>>;

    /// Write the key for a collection.
    async fn put(&self, id: &CollectionId, key: &CollectionKey) -> Result<()>;

    /// Delete the key for a collection.
    ///
    /// Returns false if there was no entry.
    async fn delete(&self, id: &CollectionId) -> Result<bool>;

    /// Read every stored key, used for the full cache rebuild on startup.
    async fn read_all(&self) -> Result<HashMap<CollectionId, CollectionKey>>;
}

/// Durable persistence of collection records.
///
/// The scheduler reconstructs its job set from this store on startup, and
/// the blocking-change check scans it.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert or update a collection record.
    async fn upsert(&self, collection: &Collection) -> Result<()>;

    /// Get a collection by id.
    async fn get(&self, id: &CollectionId) -> Result<Option<Collection>>;

    /// Delete a collection record (archival).
    ///
    /// Returns false if there was no entry.
    async fn delete(&self, id: &CollectionId) -> Result<bool>;

    /// List all known collections.
    async fn list(&self) -> Result<Vec<Collection>>;
}
