//! The unified Quill service.
//!
//! Wires the keyring cache, distributor, lifecycle, and scheduler into one
//! constructed instance and exposes the thin operations HTTP-facing code
//! calls into. Construction takes every collaborator up front; there is no
//! ambient global to initialise.

use std::sync::Arc;

use quill_core::{Collection, CollectionId, CollectionOwner, User};
use quill_distrib::{
    DistributionReport, KeyDistributor, PersistedUserStore, SessionDirectory, WorkerPool,
    DEFAULT_WORKER_PERMITS,
};
use quill_keyring::{AccessResolver, Keyring, KeyringCache, UserKeyring};
use quill_store::{CollectionStore, KeyStore};

use crate::error::Result;
use crate::lifecycle::CollectionLifecycle;
use crate::scheduler::{Notifier, PublishScheduler, Publisher, ReconcileReport, SchedulerConfig};

/// Configuration for the Quill service.
#[derive(Debug, Clone)]
pub struct QuillConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Size of the shared worker pool used by distribution and publishing.
    pub worker_permits: usize,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            worker_permits: DEFAULT_WORKER_PERMITS,
        }
    }
}

/// The main Quill service.
///
/// Provides a unified API for:
/// - Creating collections and claiming content URIs
/// - Approving and unlocking collections
/// - Distributing collection keys
/// - Scheduling and cancelling timed publishes
pub struct Quill {
    cache: Arc<KeyringCache>,
    keyring: Keyring,
    distributor: Arc<KeyDistributor>,
    lifecycle: Arc<CollectionLifecycle>,
    scheduler: Arc<PublishScheduler>,
}

impl Quill {
    /// Construct the service over its stores and collaborators.
    ///
    /// Performs the initial keyring cache load from the key store.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        key_store: Arc<dyn KeyStore>,
        collection_store: Arc<dyn CollectionStore>,
        users: Arc<dyn PersistedUserStore>,
        sessions: Arc<dyn SessionDirectory>,
        resolver: Arc<dyn AccessResolver>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
        config: QuillConfig,
    ) -> Result<Self> {
        let cache = Arc::new(KeyringCache::new(key_store).await?);
        let pool = WorkerPool::new(config.worker_permits);

        let keyring = Keyring::new(cache.clone(), resolver.clone());
        let distributor = Arc::new(KeyDistributor::new(
            users,
            sessions,
            resolver.clone(),
            cache.clone(),
            pool.clone(),
        ));
        let lifecycle = Arc::new(CollectionLifecycle::new(
            collection_store,
            cache.clone(),
            distributor.clone(),
            resolver,
        ));
        let scheduler = Arc::new(PublishScheduler::new(
            lifecycle.clone(),
            cache.clone(),
            publisher,
            notifier,
            pool,
            config.scheduler,
        ));

        Ok(Self {
            cache,
            keyring,
            distributor,
            lifecycle,
            scheduler,
        })
    }

    /// Startup reconciliation: rebuild the scheduler's job set from
    /// persisted collection state and alert on interrupted approvals.
    ///
    /// Call once, after construction (which loads the keyring cache).
    pub async fn startup(&self) -> Result<ReconcileReport> {
        self.scheduler.reconcile().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a collection, generate its key, and distribute it.
    pub async fn create_collection(
        &self,
        creator_keyring: &mut UserKeyring,
        id: CollectionId,
        name: impl Into<String>,
        owner: CollectionOwner,
    ) -> Result<Collection> {
        self.lifecycle
            .create_collection(creator_keyring, id, name, owner)
            .await
    }

    /// Approve a collection. Returns false when the actor lacks edit rights.
    pub async fn approve(
        &self,
        id: &CollectionId,
        actor: &User,
        actor_keyring: &UserKeyring,
    ) -> Result<bool> {
        self.lifecycle.approve(id, actor, actor_keyring).await
    }

    /// Unlock an approved collection and cancel any pending publish.
    pub async fn unlock(&self, id: &CollectionId, actor: &User) -> Result<bool> {
        let unlocked = self.lifecycle.unlock(id, actor).await?;
        if unlocked {
            self.scheduler.cancel(id);
        }
        Ok(unlocked)
    }

    /// Set a publish date and register the timed publish trigger.
    pub async fn schedule_publish(&self, id: &CollectionId, publish_at_ms: i64) -> Result<()> {
        if publish_at_ms <= quill_core::now_millis() {
            return Err(crate::error::QuillError::ScheduleInPast(id.clone()));
        }
        let collection = self.lifecycle.set_publish_date(id, publish_at_ms).await?;
        self.scheduler.schedule_publish(&collection)
    }

    /// Cancel a pending publish trigger. No-op when nothing is pending.
    pub fn cancel_publish(&self, id: &CollectionId) {
        self.scheduler.cancel(id);
    }

    /// Reconcile per-user key holdings for a collection.
    pub async fn distribute_collection_key(
        &self,
        source_keyring: &UserKeyring,
        id: &CollectionId,
        is_new: bool,
    ) -> Result<DistributionReport> {
        self.lifecycle
            .redistribute_key(id, source_keyring, is_new)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Component Access
    // ─────────────────────────────────────────────────────────────────────────

    /// The process-wide keyring cache.
    pub fn cache(&self) -> &Arc<KeyringCache> {
        &self.cache
    }

    /// The permission-checked keyring façade.
    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// The key distributor.
    pub fn distributor(&self) -> &Arc<KeyDistributor> {
        &self.distributor
    }

    /// The collection lifecycle service.
    pub fn lifecycle(&self) -> &Arc<CollectionLifecycle> {
        &self.lifecycle
    }

    /// The publish scheduler.
    pub fn scheduler(&self) -> &Arc<PublishScheduler> {
        &self.scheduler
    }
}
