//! The publish scheduler.
//!
//! Schedules, cancels, and executes timed publish triggers, and
//! reconstructs its job set from persisted collection state on startup.
//! Timers live on the tokio timer wheel; execution of a fired trigger runs
//! on the shared worker pool so a slow or stuck publish cannot delay other
//! collections' triggers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use quill_core::{now_millis, Collection, CollectionId, CollectionKey};
use quill_distrib::WorkerPool;
use quill_keyring::KeyringCache;

use crate::error::{QuillError, Result};
use crate::lifecycle::CollectionLifecycle;

/// Failure from the notification collaborator.
#[derive(Debug, Error)]
#[error("notifier: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget operator alerts.
///
/// A notifier failure must never fail the operation that raised the alert;
/// the scheduler logs and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn alert(
        &self,
        collection: &Collection,
        channel: &str,
        message: &str,
        fields: &[(String, String)],
    ) -> std::result::Result<(), NotifyError>;
}

/// Failure from the publishing collaborator.
#[derive(Debug, Error)]
#[error("publisher: {0}")]
pub struct PublishError(pub String);

/// The actual content-moving operation: decrypts working content with the
/// collection key and re-encrypts it into the published store.
///
/// A checked failure marks the job Failed and is never retried
/// automatically, since a retry could double-apply side effects.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        collection: &Collection,
        key: &CollectionKey,
        actor: &str,
    ) -> std::result::Result<bool, PublishError>;
}

/// State of a scheduled publish job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Scheduled,
    Running,
    Published,
    Failed,
    Cancelled,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Channel operator alerts are sent to.
    pub alarm_channel: String,
    /// Actor identity recorded against scheduled publishes.
    pub actor: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            alarm_channel: "publishing-alerts".to_string(),
            actor: "system".to_string(),
        }
    }
}

/// Outcome of startup reconciliation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileReport {
    /// Collections re-scheduled for a future publish.
    pub scheduled: usize,
    /// Operator alerts raised.
    pub alerts: usize,
}

struct PendingJob {
    handle: JoinHandle<()>,
    fire_at_ms: i64,
}

/// Schedules and executes timed publishes. One instance per process.
pub struct PublishScheduler {
    lifecycle: Arc<CollectionLifecycle>,
    cache: Arc<KeyringCache>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    pool: WorkerPool,
    config: SchedulerConfig,
    jobs: Mutex<HashMap<CollectionId, PendingJob>>,
    states: Mutex<HashMap<CollectionId, JobState>>,
}

impl PublishScheduler {
    /// Construct the scheduler from its collaborators and the shared pool.
    pub fn new(
        lifecycle: Arc<CollectionLifecycle>,
        cache: Arc<KeyringCache>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
        pool: WorkerPool,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            lifecycle,
            cache,
            publisher,
            notifier,
            pool,
            config,
            jobs: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Register a timer that publishes the collection at its publish date.
    ///
    /// Fails when the collection has no publish date or the date has
    /// already passed. Rescheduling replaces any pending timer for the same
    /// collection.
    pub fn schedule_publish(self: &Arc<Self>, collection: &Collection) -> Result<()> {
        let id = collection.id.clone();

        let publish_at = collection
            .publish_date
            .ok_or_else(|| QuillError::PublishDateMissing(id.clone()))?;

        let now = now_millis();
        if publish_at <= now {
            return Err(QuillError::ScheduleInPast(id));
        }
        let delay = Duration::from_millis((publish_at - now) as u64);

        let mut jobs = self.jobs.lock().unwrap();
        if let Some(previous) = jobs.remove(&id) {
            previous.handle.abort();
        }

        self.set_state(&id, JobState::Scheduled);

        let scheduler = self.clone();
        let timer_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.begin_execution(timer_id);
        });

        jobs.insert(
            id.clone(),
            PendingJob {
                handle,
                fire_at_ms: publish_at,
            },
        );

        tracing::info!(collection_id = %id, publish_at_ms = publish_at, "publish scheduled");
        Ok(())
    }

    /// Cancel a pending publish.
    ///
    /// A no-op when no pending timer exists: already-running and
    /// already-complete jobs cannot be cancelled.
    pub fn cancel(&self, id: &CollectionId) {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.remove(id) {
            Some(job) => {
                job.handle.abort();
                self.set_state(id, JobState::Cancelled);
                tracing::info!(collection_id = %id, "scheduled publish cancelled");
            }
            None => {
                tracing::info!(collection_id = %id, "no pending publish to cancel");
            }
        }
    }

    /// Current state of a collection's publish job, if one was ever
    /// scheduled this process lifetime.
    pub fn job_state(&self, id: &CollectionId) -> Option<JobState> {
        self.states.lock().unwrap().get(id).copied()
    }

    /// Number of timers currently pending.
    pub fn pending_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Trigger time of a pending job, for observability.
    pub fn pending_fire_at(&self, id: &CollectionId) -> Option<i64> {
        self.jobs.lock().unwrap().get(id).map(|j| j.fire_at_ms)
    }

    /// Rebuild scheduler state from persisted collections after a restart.
    ///
    /// Timers do not survive a restart, so every collection with a future
    /// publish date is re-scheduled. Collections found InProgress or Error
    /// indicate an interrupted approval and raise an operator alert, as
    /// does a publish date that passed while the process was down - missed
    /// publishes are never fired automatically.
    pub async fn reconcile(self: &Arc<Self>) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let now = now_millis();

        for collection in self.lifecycle.list().await? {
            if collection.approval_status.needs_operator_attention() {
                tracing::info!(
                    collection_id = %collection.id,
                    status = %collection.approval_status,
                    "collection approval is in error or in progress state on startup"
                );
                self.alert(
                    &collection,
                    "Collection approval is in IN_PROGRESS or ERROR state on startup. It may need to be re-approved manually.",
                    &[(
                        "Approval Status".to_string(),
                        collection.approval_status.to_string(),
                    )],
                )
                .await;
                report.alerts += 1;
            }

            match collection.publish_date {
                Some(publish_at) if publish_at > now => {
                    match self.schedule_publish(&collection) {
                        Ok(()) => report.scheduled += 1,
                        Err(e) => {
                            tracing::warn!(collection_id = %collection.id, "failed to re-schedule publish: {}", e);
                        }
                    }
                }
                Some(_) => {
                    self.alert(
                        &collection,
                        "Scheduled publish date passed while the process was down. Publish manually after checking the collection.",
                        &[],
                    )
                    .await;
                    report.alerts += 1;
                }
                None => {}
            }
        }

        Ok(report)
    }

    /// Timer fired: hand the publish to the worker pool.
    ///
    /// Removing the pending entry first is what makes cancellation safe to
    /// call concurrently with a trigger about to fire - once the entry is
    /// gone, cancel finds nothing and the running job is never interrupted.
    fn begin_execution(self: Arc<Self>, id: CollectionId) {
        {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.remove(&id).is_none() {
                // Cancelled between the timer firing and this point.
                return;
            }
        }

        self.set_state(&id, JobState::Running);

        let scheduler = self.clone();
        self.pool.spawn(async move {
            scheduler.execute(id).await;
        });
    }

    /// Run one publish to completion and record the outcome.
    async fn execute(self: Arc<Self>, id: CollectionId) {
        tracing::info!(collection_id = %id, "running scheduled publish");

        let collection = match self.lifecycle.get(&id).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(collection_id = %id, "collection missing at publish time: {}", e);
                self.set_state(&id, JobState::Failed);
                return;
            }
        };

        // An unavailable key fails the job, never the scheduler.
        let key = match self.cache.get(&id).await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(collection_id = %id, "collection key unavailable at publish time: {}", e);
                self.fail_job(&collection, "Scheduled publish failed: collection key unavailable.")
                    .await;
                return;
            }
        };

        match self
            .publisher
            .publish(&collection, &key, &self.config.actor)
            .await
        {
            Ok(true) => {
                self.set_state(&id, JobState::Published);
                tracing::info!(collection_id = %id, "collection published");

                if let Err(e) = self.lifecycle.archive(&id).await {
                    tracing::error!(collection_id = %id, "failed to archive published collection: {}", e);
                }
            }
            Ok(false) => {
                self.fail_job(&collection, "Scheduled publish was rejected by the publisher.")
                    .await;
            }
            Err(e) => {
                tracing::error!(collection_id = %id, "publisher failed: {}", e);
                self.fail_job(&collection, "Scheduled publish failed in the publisher.")
                    .await;
            }
        }
    }

    /// Record a failed job: state, collection Error status, operator alert.
    async fn fail_job(&self, collection: &Collection, message: &str) {
        self.set_state(&collection.id, JobState::Failed);

        if let Err(e) = self.lifecycle.mark_error(&collection.id).await {
            tracing::error!(collection_id = %collection.id, "failed to record error status: {}", e);
        }

        self.alert(collection, message, &[]).await;
    }

    async fn alert(&self, collection: &Collection, message: &str, fields: &[(String, String)]) {
        if let Err(e) = self
            .notifier
            .alert(collection, &self.config.alarm_channel, message, fields)
            .await
        {
            tracing::warn!(collection_id = %collection.id, "failed to send operator alert: {}", e);
        }
    }

    fn set_state(&self, id: &CollectionId, state: JobState) {
        self.states.lock().unwrap().insert(id.clone(), state);
    }
}
