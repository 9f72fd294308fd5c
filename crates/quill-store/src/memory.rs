//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use quill_core::{Collection, CollectionId, CollectionKey};

use crate::error::Result;
use crate::traits::{CollectionStore, KeyStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    keys: RwLock<HashMap<CollectionId, CollectionKey>>,
    collections: RwLock<HashMap<CollectionId, Collection>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn get(&self, id: &CollectionId) -> Result<Option<CollectionKey>> {
        let keys = self.keys.read().unwrap();
        Ok(keys.get(id).cloned())
    }

    async fn put(&self, id: &CollectionId, key: &CollectionKey) -> Result<()> {
        let mut keys = self.keys.write().unwrap();
        keys.insert(id.clone(), key.clone());
        Ok(())
    }

    async fn delete(&self, id: &CollectionId) -> Result<bool> {
        let mut keys = self.keys.write().unwrap();
        Ok(keys.remove(id).is_some())
    }

    async fn read_all(&self) -> Result<HashMap<CollectionId, CollectionKey>> {
        let keys = self.keys.read().unwrap();
        Ok(keys.clone())
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn upsert(&self, collection: &Collection) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        collections.insert(collection.id.clone(), collection.clone());
        Ok(())
    }

    async fn get(&self, id: &CollectionId) -> Result<Option<Collection>> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(id).cloned())
    }

    async fn delete(&self, id: &CollectionId) -> Result<bool> {
        let mut collections = self.collections.write().unwrap();
        Ok(collections.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Collection>> {
        let collections = self.collections.read().unwrap();
        Ok(collections.values().cloned().collect())
    }
}
