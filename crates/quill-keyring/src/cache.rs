//! The process-wide keyring cache.
//!
//! Maps collection id → encryption key, populated lazily from the key store
//! and eagerly from an unlocking user's keyring. For a given collection id,
//! every read returns the same key value for the lifetime of the process
//! unless the key is explicitly removed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use quill_core::{CollectionId, CollectionKey};
use quill_store::KeyStore;

use crate::error::{KeyringError, Result};
use crate::user::UserKeyring;

/// Process-wide cache of collection keys, backed by a durable [`KeyStore`].
///
/// All mutating operations serialize behind the write lock; reads share the
/// read lock. A global lock is sufficient for the expected key counts.
pub struct KeyringCache {
    store: Arc<dyn KeyStore>,
    keys: RwLock<HashMap<CollectionId, CollectionKey>>,
}

impl KeyringCache {
    /// Construct the cache over a key store and perform the initial load.
    pub async fn new(store: Arc<dyn KeyStore>) -> Result<Self> {
        let cache = Self {
            store,
            keys: RwLock::new(HashMap::new()),
        };
        cache.load().await?;
        Ok(cache)
    }

    /// Get the key for a collection.
    ///
    /// Returns the cached key if present, otherwise queries the store and
    /// caches the result. Fails with [`KeyringError::KeyNotFound`] when the
    /// store has no entry either.
    pub async fn get(&self, id: &CollectionId) -> Result<CollectionKey> {
        if id.is_empty() {
            return Err(KeyringError::InvalidInput("collection id is empty"));
        }

        if let Some(key) = self.keys.read().await.get(id) {
            return Ok(key.clone());
        }

        // Miss: fill from the store under the write lock so concurrent
        // fills of the same id cannot interleave with add/remove.
        let mut keys = self.keys.write().await;
        if let Some(key) = keys.get(id) {
            return Ok(key.clone());
        }

        match self.store.get(id).await? {
            Some(key) => {
                keys.insert(id.clone(), key.clone());
                Ok(key)
            }
            None => Err(KeyringError::KeyNotFound(id.clone())),
        }
    }

    /// Add a key for a collection.
    ///
    /// Idempotent for the same value. A *different* value for an id already
    /// held by the cache or the store fails with
    /// [`KeyringError::KeyMismatch`] without mutating any state. When the
    /// store has no entry the key is persisted first and cached only after
    /// the write succeeds.
    pub async fn add(&self, id: &CollectionId, key: &CollectionKey) -> Result<()> {
        if id.is_empty() {
            return Err(KeyringError::InvalidInput("collection id is empty"));
        }

        let mut keys = self.keys.write().await;

        if let Some(existing) = keys.get(id) {
            if existing != key {
                tracing::error!(collection_id = %id, "different key already cached for collection");
                return Err(KeyringError::KeyMismatch(id.clone()));
            }
            return Ok(());
        }

        match self.store.get(id).await? {
            Some(stored) => {
                if &stored != key {
                    tracing::error!(collection_id = %id, "different key already stored for collection");
                    return Err(KeyringError::KeyMismatch(id.clone()));
                }
            }
            None => {
                self.store.put(id, key).await?;
            }
        }

        keys.insert(id.clone(), key.clone());
        Ok(())
    }

    /// Remove the key for a collection.
    ///
    /// Deletes from the store first; the cache entry is evicted only after
    /// the durable deletion succeeds. Fails with
    /// [`KeyringError::KeyNotFound`] when the store has no entry.
    pub async fn remove(&self, id: &CollectionId) -> Result<()> {
        if id.is_empty() {
            return Err(KeyringError::InvalidInput("collection id is empty"));
        }

        let mut keys = self.keys.write().await;

        if !self.store.delete(id).await? {
            return Err(KeyringError::KeyNotFound(id.clone()));
        }

        keys.remove(id);
        Ok(())
    }

    /// Replace the entire in-memory mapping with the store's contents.
    ///
    /// Used for the full cache rebuild on process start.
    pub async fn load(&self) -> Result<()> {
        let all = self.store.read_all().await?;
        let mut keys = self.keys.write().await;
        *keys = all;
        Ok(())
    }

    /// Eagerly add every entry of an unlocking user's keyring.
    ///
    /// Each entry goes through [`KeyringCache::add`], so a key disagreeing
    /// with the cache or store surfaces as [`KeyringError::KeyMismatch`].
    pub async fn import_unlocked(&self, keyring: &UserKeyring) -> Result<()> {
        for (id, key) in keyring.entries()? {
            self.add(&CollectionId::new(id.clone()), key).await?;
        }
        Ok(())
    }

    /// Number of keys currently cached.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// True if no keys are cached.
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}
