//! Collection lifecycle: content-tree writes gated by the blocking-change
//! check, and the approve/unlock transitions that keys follow.

use std::sync::Arc;

use quill_core::{
    Collection, CollectionId, CollectionKey, CollectionOwner, ContentUri, TreeKind, User,
};
use quill_distrib::{DistributionReport, KeyDistributor};
use quill_keyring::{AccessResolver, KeyringCache, KeyringError, UserKeyring};
use quill_store::CollectionStore;

use crate::error::{QuillError, Result};

/// Owns collection state and the transitions that gate publishing.
pub struct CollectionLifecycle {
    collections: Arc<dyn CollectionStore>,
    cache: Arc<KeyringCache>,
    distributor: Arc<KeyDistributor>,
    resolver: Arc<dyn AccessResolver>,
}

impl CollectionLifecycle {
    /// Construct the lifecycle service from its collaborators.
    pub fn new(
        collections: Arc<dyn CollectionStore>,
        cache: Arc<KeyringCache>,
        distributor: Arc<KeyDistributor>,
        resolver: Arc<dyn AccessResolver>,
    ) -> Self {
        Self {
            collections,
            cache,
            distributor,
            resolver,
        }
    }

    /// Get a collection by id.
    pub async fn get(&self, id: &CollectionId) -> Result<Collection> {
        self.collections
            .get(id)
            .await?
            .ok_or_else(|| QuillError::CollectionNotFound(id.clone()))
    }

    /// List every known collection.
    pub async fn list(&self) -> Result<Vec<Collection>> {
        Ok(self.collections.list().await?)
    }

    /// Create a collection and its encryption key.
    ///
    /// The key is placed in the creator's unlocked keyring, persisted via
    /// the keyring cache, and distributed to the entitled set.
    pub async fn create_collection(
        &self,
        creator_keyring: &mut UserKeyring,
        id: CollectionId,
        name: impl Into<String>,
        owner: CollectionOwner,
    ) -> Result<Collection> {
        if self.collections.get(&id).await?.is_some() {
            return Err(QuillError::CollectionExists(id));
        }

        let collection = Collection::new(id, name, owner);
        let key = CollectionKey::generate();

        creator_keyring
            .put(collection.id.as_str(), key.clone())
            .map_err(QuillError::Keyring)?;

        self.collections.upsert(&collection).await?;
        self.distributor
            .distribute_collection_key(creator_keyring, &collection, true)
            .await?;

        Ok(collection)
    }

    /// Scan all other collections' trees for a URI.
    ///
    /// Returns the collection currently claiming the URI, or `None` when the
    /// requesting collection may proceed. A content URI may be claimed by at
    /// most one collection at a time.
    ///
    /// This is advisory-then-enforced, not transactional: two collections
    /// racing to claim the same URI can both pass the check before either
    /// writes. Callers must treat a collision detected after the check as a
    /// retryable conflict.
    pub async fn check_for_collection_blocking_change(
        &self,
        requesting: &Collection,
        uri: &ContentUri,
    ) -> Result<Option<Collection>> {
        for other in self.collections.list().await? {
            if other.id == requesting.id {
                continue;
            }
            if other.contains_uri(uri) {
                return Ok(Some(other));
            }
        }
        Ok(None)
    }

    /// Claim a URI for a collection and place it in the in-progress tree.
    ///
    /// Runs the blocking-change check first; a URI held elsewhere fails with
    /// [`QuillError::BlockingChange`].
    pub async fn add_content(&self, id: &CollectionId, uri: ContentUri) -> Result<()> {
        let mut collection = self.get(id).await?;

        if let Some(holder) = self
            .check_for_collection_blocking_change(&collection, &uri)
            .await?
        {
            return Err(QuillError::BlockingChange {
                uri,
                held_by: holder.id,
            });
        }

        collection.add_uri(uri, TreeKind::InProgress);
        self.collections.upsert(&collection).await?;
        Ok(())
    }

    /// Move a URI this collection already claims to the next review stage.
    pub async fn move_content(
        &self,
        id: &CollectionId,
        uri: &ContentUri,
        to: TreeKind,
    ) -> Result<()> {
        let mut collection = self.get(id).await?;
        collection.transfer_uri(uri, to)?;
        self.collections.upsert(&collection).await?;
        Ok(())
    }

    /// Approve a collection for publishing.
    ///
    /// Returns false without touching anything when the actor may not edit
    /// the collection. All content must be reviewed. The key is
    /// re-distributed as part of approval; a failure there leaves the
    /// collection in the Error state for operator attention.
    pub async fn approve(
        &self,
        id: &CollectionId,
        actor: &User,
        actor_keyring: &UserKeyring,
    ) -> Result<bool> {
        let mut collection = self.get(id).await?;

        if !self.resolver.can_edit(&actor.email, &collection).await? {
            return Ok(false);
        }

        if !collection.in_progress.is_empty() || !collection.complete.is_empty() {
            return Err(QuillError::ContentNotReviewed(id.clone()));
        }

        collection.begin_review()?;
        self.collections.upsert(&collection).await?;

        match self
            .distributor
            .distribute_collection_key(actor_keyring, &collection, false)
            .await
        {
            Ok(report) => {
                if !report.is_clean() {
                    tracing::warn!(
                        collection_id = %id,
                        failures = report.failures.len(),
                        "key distribution completed with per-user failures"
                    );
                }
            }
            Err(e) => {
                tracing::error!(collection_id = %id, "key distribution failed during approval: {}", e);
                collection.mark_error();
                self.collections.upsert(&collection).await?;
                return Err(e.into());
            }
        }

        collection.mark_approved()?;
        self.collections.upsert(&collection).await?;

        tracing::info!(collection_id = %id, "collection approved");
        Ok(true)
    }

    /// Return an approved collection to editing.
    ///
    /// Returns false without touching anything when the actor may not edit
    /// the collection. The caller is responsible for cancelling any pending
    /// publish trigger.
    pub async fn unlock(&self, id: &CollectionId, actor: &User) -> Result<bool> {
        let mut collection = self.get(id).await?;

        if !self.resolver.can_edit(&actor.email, &collection).await? {
            return Ok(false);
        }

        collection.unlock()?;
        collection.publish_date = None;
        self.collections.upsert(&collection).await?;

        tracing::info!(collection_id = %id, "collection unlocked");
        Ok(true)
    }

    /// Record a publish date on a collection.
    pub async fn set_publish_date(&self, id: &CollectionId, publish_at_ms: i64) -> Result<Collection> {
        let mut collection = self.get(id).await?;
        collection.publish_date = Some(publish_at_ms);
        self.collections.upsert(&collection).await?;
        Ok(collection)
    }

    /// Put a collection into the Error state for operator attention.
    pub async fn mark_error(&self, id: &CollectionId) -> Result<()> {
        let mut collection = self.get(id).await?;
        collection.mark_error();
        self.collections.upsert(&collection).await?;
        Ok(())
    }

    /// Archive a collection after a successful publish.
    ///
    /// Deletes the collection record and removes its key from the durable
    /// store and the cache. A key that was already gone is tolerated.
    pub async fn archive(&self, id: &CollectionId) -> Result<()> {
        self.collections.delete(id).await?;

        match self.cache.remove(id).await {
            Ok(()) | Err(KeyringError::KeyNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(collection_id = %id, "collection archived");
        Ok(())
    }

    /// Re-run key distribution for a collection.
    pub async fn redistribute_key(
        &self,
        id: &CollectionId,
        source_keyring: &UserKeyring,
        is_new: bool,
    ) -> Result<DistributionReport> {
        let collection = self.get(id).await?;
        Ok(self
            .distributor
            .distribute_collection_key(source_keyring, &collection, is_new)
            .await?)
    }
}
