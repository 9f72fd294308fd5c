//! Permission-checked keyring access.
//!
//! Wraps the [`KeyringCache`] so only users authorized for a collection can
//! obtain or change its key. An explicit, constructed service instance:
//! both collaborators are required up front.

use std::sync::Arc;

use quill_core::{Collection, CollectionKey, User};

use crate::cache::KeyringCache;
use crate::error::{KeyringError, Result};
use crate::resolver::AccessResolver;
use crate::user::UserKeyring;

/// Permission-checked façade over the process-wide keyring cache.
///
/// Denied permission is a silent no-op (`get` returns `None`, `add` and
/// `remove` do nothing), never a hard failure: inbound handlers treat
/// "no key for you" and "no key at all" differently from real errors.
pub struct Keyring {
    cache: Arc<KeyringCache>,
    resolver: Arc<dyn AccessResolver>,
}

impl Keyring {
    /// Construct the façade from its collaborators.
    pub fn new(cache: Arc<KeyringCache>, resolver: Arc<dyn AccessResolver>) -> Self {
        Self { cache, resolver }
    }

    /// Get a collection's key on behalf of a user.
    ///
    /// Returns `None` when the resolver denies access. A missing key for an
    /// authorized user is an error: it means distribution never reached the
    /// store.
    pub async fn get(&self, user: &User, collection: &Collection) -> Result<Option<CollectionKey>> {
        validate(collection)?;

        if !self.resolver.has_access(&user.email, collection).await? {
            return Ok(None);
        }

        self.cache.get(&collection.id).await.map(Some)
    }

    /// Add a collection's key on behalf of a user.
    ///
    /// Silent no-op when the user cannot edit the collection.
    pub async fn add(
        &self,
        user: &User,
        collection: &Collection,
        key: &CollectionKey,
    ) -> Result<()> {
        validate(collection)?;

        if !self.resolver.can_edit(&user.email, collection).await? {
            return Ok(());
        }

        self.cache.add(&collection.id, key).await
    }

    /// Remove a collection's key on behalf of a user.
    ///
    /// Silent no-op when the user cannot edit the collection.
    pub async fn remove(&self, user: &User, collection: &Collection) -> Result<()> {
        validate(collection)?;

        if !self.resolver.can_edit(&user.email, collection).await? {
            return Ok(());
        }

        self.cache.remove(&collection.id).await
    }

    /// Populate the process-wide cache from a user's just-unlocked keyring.
    pub async fn populate_from_user(&self, keyring: &UserKeyring) -> Result<()> {
        if !keyring.is_unlocked() {
            return Err(KeyringError::KeyringLocked);
        }
        self.cache.import_unlocked(keyring).await
    }
}

fn validate(collection: &Collection) -> Result<()> {
    if collection.id.is_empty() {
        return Err(KeyringError::InvalidInput("collection id is empty"));
    }
    Ok(())
}
