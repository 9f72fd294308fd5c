//! The key distributor.
//!
//! Reconciles each user's key holdings against the access resolver's target
//! entitlement set whenever collection membership or a key changes.

use std::sync::Arc;

use quill_core::{Collection, CollectionId, CollectionKey};
use quill_keyring::{AccessResolver, KeyringCache, UserKeyring};

use crate::error::{DistribError, Result};
use crate::pool::WorkerPool;
use crate::traits::{PersistedUserStore, SessionDirectory};

/// Which direction a per-user operation went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Grant,
    Revoke,
}

/// A per-user failure recorded against a distribution batch.
#[derive(Debug)]
pub struct UserFailure {
    pub email: String,
    pub action: KeyAction,
    pub error: String,
}

/// Outcome of a distribution batch.
///
/// Per-user failures land here rather than aborting the batch: a single
/// held-up user must not block scheduled publication for everyone else.
#[derive(Debug, Default)]
pub struct DistributionReport {
    /// Users who received the key.
    pub granted: usize,
    /// Users the key was revoked from.
    pub revoked: usize,
    /// Users skipped because their keyring is not yet materialized.
    pub skipped: usize,
    /// Per-user failures, in completion order.
    pub failures: Vec<UserFailure>,
}

impl DistributionReport {
    /// True when every per-user operation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Granted => self.granted += 1,
            TaskOutcome::Revoked => self.revoked += 1,
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

/// One independent, idempotent unit of reconciliation work.
///
/// The `CacheWrite` unit is a synchronization barrier: it must run only
/// after every grant and revoke has completed or failed, so a publish job
/// triggered concurrently either sees no key yet or the fully-distributed
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTask {
    Revoke { email: String },
    Grant { email: String },
    CacheWrite,
}

enum TaskOutcome {
    Granted,
    Revoked,
    Skipped,
    Failed(UserFailure),
}

/// Reconciles per-user key holdings against entitlements.
pub struct KeyDistributor {
    users: Arc<dyn PersistedUserStore>,
    sessions: Arc<dyn SessionDirectory>,
    resolver: Arc<dyn AccessResolver>,
    cache: Arc<KeyringCache>,
    pool: WorkerPool,
}

impl KeyDistributor {
    /// Construct the distributor from its collaborators and the shared
    /// worker pool.
    pub fn new(
        users: Arc<dyn PersistedUserStore>,
        sessions: Arc<dyn SessionDirectory>,
        resolver: Arc<dyn AccessResolver>,
        cache: Arc<KeyringCache>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            users,
            sessions,
            resolver,
            cache,
            pool,
        }
    }

    /// Distribute a collection's key to the users who should hold it.
    ///
    /// The key is resolved from the caller's unlocked keyring. Per-user
    /// failures are collected in the returned report; the scheduler-facing
    /// cache write still happens once every per-user task has finished.
    pub async fn distribute_collection_key(
        &self,
        source: &UserKeyring,
        collection: &Collection,
        is_new: bool,
    ) -> Result<DistributionReport> {
        let key = source
            .get(collection.id.as_str())
            .map_err(DistribError::Keyring)?
            .cloned()
            .ok_or_else(|| DistribError::MissingSourceKey(collection.id.clone()))?;

        let tasks = self.key_assignment_tasks(collection, is_new).await?;
        self.run_tasks(&collection.id, &key, tasks).await
    }

    /// Compute the reconciliation as independent units of work.
    ///
    /// For an existing collection: one revoke per known user outside the
    /// entitled set, one grant per remaining known user. For a new
    /// collection there is nothing to revoke and only the entitled set is
    /// granted. The terminal `CacheWrite` is always last.
    pub async fn key_assignment_tasks(
        &self,
        collection: &Collection,
        is_new: bool,
    ) -> Result<Vec<KeyTask>> {
        let target = self.resolver.entitled_users(collection).await?;
        let known = self.users.list().await?;

        let mut tasks = Vec::with_capacity(known.len() + 1);

        if is_new {
            let mut recipients: Vec<&str> =
                target.iter().map(String::as_str).collect();
            recipients.sort_unstable();
            for email in recipients {
                tasks.push(KeyTask::Grant {
                    email: email.to_string(),
                });
            }
        } else {
            for user in &known {
                if !target.contains(&user.email) {
                    tasks.push(KeyTask::Revoke {
                        email: user.email.clone(),
                    });
                }
            }
            for user in &known {
                if target.contains(&user.email) {
                    tasks.push(KeyTask::Grant {
                        email: user.email.clone(),
                    });
                }
            }
        }

        tasks.push(KeyTask::CacheWrite);
        Ok(tasks)
    }

    /// Execute reconciliation units on the bounded pool.
    ///
    /// Grants and revokes run concurrently; the cache write runs strictly
    /// after all of them, regardless of its position in `tasks`.
    pub async fn run_tasks(
        &self,
        collection_id: &CollectionId,
        key: &CollectionKey,
        tasks: Vec<KeyTask>,
    ) -> Result<DistributionReport> {
        let mut handles = Vec::with_capacity(tasks.len());
        let mut cache_write = false;

        for task in tasks {
            match task {
                KeyTask::Grant { email } => {
                    handles.push(self.pool.spawn(grant_to_user(
                        self.users.clone(),
                        self.sessions.clone(),
                        email,
                        collection_id.as_str().to_string(),
                        key.clone(),
                    )));
                }
                KeyTask::Revoke { email } => {
                    handles.push(self.pool.spawn(revoke_from_user(
                        self.users.clone(),
                        self.sessions.clone(),
                        email,
                        collection_id.as_str().to_string(),
                    )));
                }
                KeyTask::CacheWrite => cache_write = true,
            }
        }

        let mut report = DistributionReport::default();
        for handle in handles {
            match handle.await {
                Ok(outcome) => report.record(outcome),
                Err(e) => tracing::error!("distribution worker panicked: {}", e),
            }
        }

        // Barrier reached: every per-user task above has completed or
        // failed before the scheduler-facing cache learns the key.
        if cache_write {
            self.cache.add(collection_id, key).await?;
        }

        Ok(report)
    }

    /// Distribute a shared application key.
    ///
    /// For every known user: grant if the user is an administrator or has
    /// the global edit capability, otherwise revoke. Used for keys that
    /// protect a shared backend integration rather than a single collection.
    pub async fn distribute_application_key(
        &self,
        application_id: &str,
        key: &CollectionKey,
    ) -> Result<DistributionReport> {
        let known = self.users.list().await?;

        let mut handles = Vec::with_capacity(known.len());
        let mut report = DistributionReport::default();

        for user in known {
            let should_hold = match self.user_should_hold_application_key(&user.email).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(email = %user.email, "resolver failed during application key distribution: {}", e);
                    report.failures.push(UserFailure {
                        email: user.email,
                        action: KeyAction::Grant,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if should_hold {
                handles.push(self.pool.spawn(grant_to_user(
                    self.users.clone(),
                    self.sessions.clone(),
                    user.email,
                    application_id.to_string(),
                    key.clone(),
                )));
            } else {
                handles.push(self.pool.spawn(revoke_from_user(
                    self.users.clone(),
                    self.sessions.clone(),
                    user.email,
                    application_id.to_string(),
                )));
            }
        }

        for handle in handles {
            match handle.await {
                Ok(outcome) => report.record(outcome),
                Err(e) => tracing::error!("distribution worker panicked: {}", e),
            }
        }

        Ok(report)
    }

    async fn user_should_hold_application_key(
        &self,
        email: &str,
    ) -> std::result::Result<bool, quill_keyring::AccessError> {
        Ok(self.resolver.is_administrator(email).await?
            || self.resolver.is_editor(email).await?)
    }
}

/// Write the key into one user's persisted keyring and, if the user has an
/// active session, into their in-memory keyring too.
async fn grant_to_user(
    users: Arc<dyn PersistedUserStore>,
    sessions: Arc<dyn SessionDirectory>,
    email: String,
    id: String,
    key: CollectionKey,
) -> TaskOutcome {
    match users.get_by_email(&email).await {
        Ok(Some(user)) if !user.has_keyring => return TaskOutcome::Skipped,
        Ok(Some(_)) => {}
        Ok(None) => return TaskOutcome::Skipped,
        Err(e) => {
            tracing::warn!(email = %email, "failed to look up user for key grant: {}", e);
            return TaskOutcome::Failed(UserFailure {
                email,
                action: KeyAction::Grant,
                error: e.to_string(),
            });
        }
    }

    if let Err(e) = users.add_key_to_keyring(&email, &id, &key).await {
        tracing::warn!(email = %email, key_id = %id, "failed to persist key grant: {}", e);
        return TaskOutcome::Failed(UserFailure {
            email,
            action: KeyAction::Grant,
            error: e.to_string(),
        });
    }

    if let Some(session) = sessions.find_active_session(&email).await {
        let mut keyring = session.keyring.lock().await;
        if let Err(e) = keyring.put(id.clone(), key) {
            tracing::warn!(email = %email, key_id = %id, "session keyring not writable: {}", e);
        }
    }

    TaskOutcome::Granted
}

/// Remove the key from one user's persisted keyring and any active session
/// keyring. A user without a materialized keyring is skipped.
async fn revoke_from_user(
    users: Arc<dyn PersistedUserStore>,
    sessions: Arc<dyn SessionDirectory>,
    email: String,
    id: String,
) -> TaskOutcome {
    match users.get_by_email(&email).await {
        Ok(Some(user)) if !user.has_keyring => return TaskOutcome::Skipped,
        Ok(Some(_)) => {}
        Ok(None) => return TaskOutcome::Skipped,
        Err(e) => {
            tracing::warn!(email = %email, "failed to look up user for key revoke: {}", e);
            return TaskOutcome::Failed(UserFailure {
                email,
                action: KeyAction::Revoke,
                error: e.to_string(),
            });
        }
    }

    if let Err(e) = users.remove_key_from_keyring(&email, &id).await {
        tracing::warn!(email = %email, key_id = %id, "failed to persist key revoke: {}", e);
        return TaskOutcome::Failed(UserFailure {
            email,
            action: KeyAction::Revoke,
            error: e.to_string(),
        });
    }

    if let Some(session) = sessions.find_active_session(&email).await {
        let mut keyring = session.keyring.lock().await;
        if let Err(e) = keyring.remove(&id) {
            tracing::warn!(email = %email, key_id = %id, "session keyring not writable: {}", e);
        }
    }

    TaskOutcome::Revoked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::result::Result;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;

    use quill_core::{CollectionOwner, User};
    use quill_keyring::AccessError;
    use quill_store::MemoryStore;

    use crate::traits::{Session, UserStoreError};

    /// In-memory user store with optional injected failures.
    struct StubUsers {
        users: Vec<User>,
        keyrings: Mutex<HashMap<String, BTreeMap<String, CollectionKey>>>,
        fail_remove_for: HashSet<String>,
    }

    impl StubUsers {
        fn new(users: Vec<User>) -> Self {
            let keyrings = users
                .iter()
                .filter(|u| u.has_keyring)
                .map(|u| (u.email.clone(), BTreeMap::new()))
                .collect();
            Self {
                users,
                keyrings: Mutex::new(keyrings),
                fail_remove_for: HashSet::new(),
            }
        }

        fn failing_removal_for(mut self, email: &str) -> Self {
            self.fail_remove_for.insert(email.to_string());
            self
        }

        fn seed(&self, email: &str, id: &str, key: &CollectionKey) {
            self.keyrings
                .lock()
                .unwrap()
                .get_mut(email)
                .unwrap()
                .insert(id.to_string(), key.clone());
        }

        fn holds(&self, email: &str, id: &str) -> bool {
            self.keyrings
                .lock()
                .unwrap()
                .get(email)
                .map(|k| k.contains_key(id))
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl PersistedUserStore for StubUsers {
        async fn list(&self) -> Result<Vec<User>, UserStoreError> {
            Ok(self.users.clone())
        }

        async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
            Ok(self.users.iter().find(|u| u.email == email).cloned())
        }

        async fn add_key_to_keyring(
            &self,
            email: &str,
            id: &str,
            key: &CollectionKey,
        ) -> Result<(), UserStoreError> {
            self.keyrings
                .lock()
                .unwrap()
                .get_mut(email)
                .ok_or_else(|| UserStoreError(format!("no keyring for {}", email)))?
                .insert(id.to_string(), key.clone());
            Ok(())
        }

        async fn remove_key_from_keyring(
            &self,
            email: &str,
            id: &str,
        ) -> Result<(), UserStoreError> {
            if self.fail_remove_for.contains(email) {
                return Err(UserStoreError("disk unavailable".to_string()));
            }
            self.keyrings
                .lock()
                .unwrap()
                .get_mut(email)
                .ok_or_else(|| UserStoreError(format!("no keyring for {}", email)))?
                .remove(id);
            Ok(())
        }
    }

    /// Resolver with fixed entitlement and role sets.
    struct StubResolver {
        entitled: HashSet<String>,
        admins: HashSet<String>,
        editors: HashSet<String>,
    }

    impl StubResolver {
        fn entitling<const N: usize>(emails: [&str; N]) -> Self {
            Self {
                entitled: emails.iter().map(|s| s.to_string()).collect(),
                admins: HashSet::new(),
                editors: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl AccessResolver for StubResolver {
        async fn entitled_users(
            &self,
            _collection: &Collection,
        ) -> Result<HashSet<String>, AccessError> {
            Ok(self.entitled.clone())
        }

        async fn has_access(
            &self,
            email: &str,
            _collection: &Collection,
        ) -> Result<bool, AccessError> {
            Ok(self.entitled.contains(email))
        }

        async fn can_edit(
            &self,
            email: &str,
            _collection: &Collection,
        ) -> Result<bool, AccessError> {
            Ok(self.entitled.contains(email))
        }

        async fn is_administrator(&self, email: &str) -> Result<bool, AccessError> {
            Ok(self.admins.contains(email))
        }

        async fn is_editor(&self, email: &str) -> Result<bool, AccessError> {
            Ok(self.editors.contains(email))
        }
    }

    /// Session directory with a fixed session table.
    struct StubSessions {
        sessions: HashMap<String, Session>,
    }

    impl StubSessions {
        fn empty() -> Self {
            Self {
                sessions: HashMap::new(),
            }
        }

        fn with(email: &str) -> (Self, Session) {
            let session = Session::new(email, UserKeyring::new());
            let mut sessions = HashMap::new();
            sessions.insert(email.to_string(), session.clone());
            (Self { sessions }, session)
        }
    }

    #[async_trait]
    impl SessionDirectory for StubSessions {
        async fn find_active_session(&self, email: &str) -> Option<Session> {
            self.sessions.get(email).cloned()
        }
    }

    fn collection() -> Collection {
        Collection::new(
            CollectionId::new("economy-q3"),
            "Economy Q3",
            CollectionOwner::PublishingSupport,
        )
    }

    async fn distributor(
        users: Arc<StubUsers>,
        sessions: StubSessions,
        resolver: StubResolver,
    ) -> (KeyDistributor, Arc<KeyringCache>) {
        let cache = Arc::new(
            KeyringCache::new(Arc::new(MemoryStore::new()))
                .await
                .unwrap(),
        );
        let distributor = KeyDistributor::new(
            users,
            Arc::new(sessions),
            Arc::new(resolver),
            cache.clone(),
            WorkerPool::new(4),
        );
        (distributor, cache)
    }

    fn source_keyring(collection: &Collection, key: &CollectionKey) -> UserKeyring {
        let mut keyring = UserKeyring::new();
        keyring
            .put(collection.id.as_str(), key.clone())
            .unwrap();
        keyring
    }

    #[tokio::test]
    async fn test_reconciliation_grants_and_revokes() {
        let collection = collection();
        let key = CollectionKey::generate();

        let users = Arc::new(StubUsers::new(vec![
            User::new("u1@example.com", "U1"),
            User::new("u2@example.com", "U2"),
            User::new("u3@example.com", "U3"),
        ]));
        // Current holders: u2 and u3. Target: u1 and u2.
        users.seed("u2@example.com", collection.id.as_str(), &key);
        users.seed("u3@example.com", collection.id.as_str(), &key);

        let (distributor, cache) = distributor(
            users.clone(),
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com", "u2@example.com"]),
        )
        .await;

        let report = distributor
            .distribute_collection_key(&source_keyring(&collection, &key), &collection, false)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.granted, 2);
        assert_eq!(report.revoked, 1);
        assert!(users.holds("u1@example.com", collection.id.as_str()));
        assert!(users.holds("u2@example.com", collection.id.as_str()));
        assert!(!users.holds("u3@example.com", collection.id.as_str()));
        assert_eq!(cache.get(&collection.id).await.unwrap(), key);
    }

    #[tokio::test]
    async fn test_single_failing_user_does_not_abort_batch() {
        let collection = collection();
        let key = CollectionKey::generate();

        let users = Arc::new(
            StubUsers::new(vec![
                User::new("u1@example.com", "U1"),
                User::new("u3@example.com", "U3"),
            ])
            .failing_removal_for("u3@example.com"),
        );
        users.seed("u3@example.com", collection.id.as_str(), &key);

        let (distributor, cache) = distributor(
            users.clone(),
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com"]),
        )
        .await;

        let report = distributor
            .distribute_collection_key(&source_keyring(&collection, &key), &collection, false)
            .await
            .unwrap();

        // u1's grant and the cache write still completed.
        assert!(users.holds("u1@example.com", collection.id.as_str()));
        assert_eq!(cache.get(&collection.id).await.unwrap(), key);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].email, "u3@example.com");
        assert_eq!(report.failures[0].action, KeyAction::Revoke);
    }

    #[tokio::test]
    async fn test_user_without_keyring_is_skipped() {
        let collection = collection();
        let key = CollectionKey::generate();

        let users = Arc::new(StubUsers::new(vec![
            User::new("u1@example.com", "U1"),
            User::without_keyring("new@example.com", "New Starter"),
        ]));

        let (distributor, _cache) = distributor(
            users.clone(),
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com", "new@example.com"]),
        )
        .await;

        let report = distributor
            .distribute_collection_key(&source_keyring(&collection, &key), &collection, false)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.granted, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_new_collection_grants_entitled_set_only() {
        let collection = collection();
        let key = CollectionKey::generate();

        let users = Arc::new(StubUsers::new(vec![
            User::new("u1@example.com", "U1"),
            User::new("u2@example.com", "U2"),
        ]));

        let (distributor, _cache) = distributor(
            users.clone(),
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com"]),
        )
        .await;

        let report = distributor
            .distribute_collection_key(&source_keyring(&collection, &key), &collection, true)
            .await
            .unwrap();

        assert_eq!(report.granted, 1);
        assert_eq!(report.revoked, 0);
        assert!(users.holds("u1@example.com", collection.id.as_str()));
        assert!(!users.holds("u2@example.com", collection.id.as_str()));
    }

    #[tokio::test]
    async fn test_active_session_keyring_mutated() {
        let collection = collection();
        let key = CollectionKey::generate();

        let users = Arc::new(StubUsers::new(vec![User::new("u1@example.com", "U1")]));
        let (sessions, session) = StubSessions::with("u1@example.com");

        let (distributor, _cache) = distributor(
            users.clone(),
            sessions,
            StubResolver::entitling(["u1@example.com"]),
        )
        .await;

        distributor
            .distribute_collection_key(&source_keyring(&collection, &key), &collection, false)
            .await
            .unwrap();

        let keyring = session.keyring.lock().await;
        assert_eq!(keyring.get(collection.id.as_str()).unwrap(), Some(&key));
    }

    #[tokio::test]
    async fn test_tasks_end_with_cache_write() {
        let collection = collection();

        let users = Arc::new(StubUsers::new(vec![
            User::new("u1@example.com", "U1"),
            User::new("u2@example.com", "U2"),
        ]));

        let (distributor, _cache) = distributor(
            users,
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com"]),
        )
        .await;

        let tasks = distributor
            .key_assignment_tasks(&collection, false)
            .await
            .unwrap();

        assert_eq!(tasks.last(), Some(&KeyTask::CacheWrite));
        assert!(tasks.contains(&KeyTask::Revoke {
            email: "u2@example.com".to_string()
        }));
        assert!(tasks.contains(&KeyTask::Grant {
            email: "u1@example.com".to_string()
        }));
        assert_eq!(tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_source_key() {
        let collection = collection();
        let users = Arc::new(StubUsers::new(vec![User::new("u1@example.com", "U1")]));

        let (distributor, _cache) = distributor(
            users,
            StubSessions::empty(),
            StubResolver::entitling(["u1@example.com"]),
        )
        .await;

        let result = distributor
            .distribute_collection_key(&UserKeyring::new(), &collection, false)
            .await;

        assert!(matches!(result, Err(DistribError::MissingSourceKey(_))));
    }

    #[tokio::test]
    async fn test_application_key_policy() {
        let users = Arc::new(StubUsers::new(vec![
            User::new("admin@example.com", "Admin"),
            User::new("editor@example.com", "Editor"),
            User::new("viewer@example.com", "Viewer"),
        ]));
        let key = CollectionKey::generate();
        users.seed("viewer@example.com", "data-import", &key);

        let resolver = StubResolver {
            entitled: HashSet::new(),
            admins: ["admin@example.com".to_string()].into_iter().collect(),
            editors: ["editor@example.com".to_string()].into_iter().collect(),
        };

        let (distributor, _cache) =
            distributor(users.clone(), StubSessions::empty(), resolver).await;

        let report = distributor
            .distribute_application_key("data-import", &key)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert!(users.holds("admin@example.com", "data-import"));
        assert!(users.holds("editor@example.com", "data-import"));
        assert!(!users.holds("viewer@example.com", "data-import"));
    }
}
