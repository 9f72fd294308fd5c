//! In-memory collaborator stubs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quill::{NotifyError, PublishError};
use quill_core::{Collection, CollectionId, CollectionKey, User};
use quill_distrib::{Session, UserStoreError};
use quill_keyring::AccessError;

/// In-memory [`quill_distrib::PersistedUserStore`] with failure injection.
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
    keyrings: Mutex<HashMap<String, BTreeMap<String, CollectionKey>>>,
    fail_for: Mutex<HashSet<String>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            keyrings: Mutex::new(HashMap::new()),
            fail_for: Mutex::new(HashSet::new()),
        }
    }

    /// Register a user. A keyring is materialized when `user.has_keyring`.
    pub fn add_user(&self, user: User) {
        if user.has_keyring {
            self.keyrings
                .lock()
                .unwrap()
                .entry(user.email.clone())
                .or_default();
        }
        self.users.lock().unwrap().push(user);
    }

    /// Make every keyring operation for this user fail with an I/O error.
    pub fn fail_operations_for(&self, email: &str) {
        self.fail_for.lock().unwrap().insert(email.to_string());
    }

    /// Seed a key directly into a user's keyring.
    pub fn seed_key(&self, email: &str, id: &str, key: &CollectionKey) {
        self.keyrings
            .lock()
            .unwrap()
            .entry(email.to_string())
            .or_default()
            .insert(id.to_string(), key.clone());
    }

    /// Whether the user currently holds a key under this id.
    pub fn holds_key(&self, email: &str, id: &str) -> bool {
        self.keyrings
            .lock()
            .unwrap()
            .get(email)
            .map(|k| k.contains_key(id))
            .unwrap_or(false)
    }

    fn check_injected_failure(&self, email: &str) -> Result<(), UserStoreError> {
        if self.fail_for.lock().unwrap().contains(email) {
            return Err(UserStoreError(format!("injected failure for {}", email)));
        }
        Ok(())
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl quill_distrib::PersistedUserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn add_key_to_keyring(
        &self,
        email: &str,
        id: &str,
        key: &CollectionKey,
    ) -> Result<(), UserStoreError> {
        self.check_injected_failure(email)?;
        self.keyrings
            .lock()
            .unwrap()
            .get_mut(email)
            .ok_or_else(|| UserStoreError(format!("no keyring for {}", email)))?
            .insert(id.to_string(), key.clone());
        Ok(())
    }

    async fn remove_key_from_keyring(&self, email: &str, id: &str) -> Result<(), UserStoreError> {
        self.check_injected_failure(email)?;
        self.keyrings
            .lock()
            .unwrap()
            .get_mut(email)
            .ok_or_else(|| UserStoreError(format!("no keyring for {}", email)))?
            .remove(id);
        Ok(())
    }
}

/// [`quill_keyring::AccessResolver`] with fixed entitlement and role sets.
pub struct StaticAccessResolver {
    entitled: Mutex<HashSet<String>>,
    admins: Mutex<HashSet<String>>,
    editors: Mutex<HashSet<String>>,
}

impl StaticAccessResolver {
    /// Create a resolver that entitles nobody.
    pub fn new() -> Self {
        Self {
            entitled: Mutex::new(HashSet::new()),
            admins: Mutex::new(HashSet::new()),
            editors: Mutex::new(HashSet::new()),
        }
    }

    /// Entitle a user to every collection's key (and grant edit rights).
    pub fn entitle(&self, email: &str) {
        self.entitled.lock().unwrap().insert(email.to_string());
    }

    /// Withdraw a user's entitlement.
    pub fn revoke(&self, email: &str) {
        self.entitled.lock().unwrap().remove(email);
    }

    /// Mark a user as administrator.
    pub fn make_administrator(&self, email: &str) {
        self.admins.lock().unwrap().insert(email.to_string());
    }

    /// Grant a user the global edit capability.
    pub fn make_editor(&self, email: &str) {
        self.editors.lock().unwrap().insert(email.to_string());
    }
}

impl Default for StaticAccessResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl quill_keyring::AccessResolver for StaticAccessResolver {
    async fn entitled_users(
        &self,
        _collection: &Collection,
    ) -> Result<HashSet<String>, AccessError> {
        Ok(self.entitled.lock().unwrap().clone())
    }

    async fn has_access(&self, email: &str, _c: &Collection) -> Result<bool, AccessError> {
        Ok(self.entitled.lock().unwrap().contains(email))
    }

    async fn can_edit(&self, email: &str, _c: &Collection) -> Result<bool, AccessError> {
        Ok(self.entitled.lock().unwrap().contains(email))
    }

    async fn is_administrator(&self, email: &str) -> Result<bool, AccessError> {
        Ok(self.admins.lock().unwrap().contains(email))
    }

    async fn is_editor(&self, email: &str) -> Result<bool, AccessError> {
        Ok(self.editors.lock().unwrap().contains(email))
    }
}

/// [`quill_distrib::SessionDirectory`] over a fixed session table.
pub struct InMemorySessionDirectory {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Log a user in with a fresh unlocked keyring, returning the session.
    pub fn login(&self, email: &str) -> Session {
        let session = Session::new(email, quill_keyring::UserKeyring::new());
        self.sessions
            .lock()
            .unwrap()
            .insert(email.to_string(), session.clone());
        session
    }
}

impl Default for InMemorySessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl quill_distrib::SessionDirectory for InMemorySessionDirectory {
    async fn find_active_session(&self, email: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(email).cloned()
    }
}

/// [`quill::Notifier`] that records every alert message.
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(CollectionId, String)>>,
}

impl RecordingNotifier {
    /// Create with no recorded alerts.
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    /// The (collection id, message) pairs recorded so far.
    pub fn alerts(&self) -> Vec<(CollectionId, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl quill::Notifier for RecordingNotifier {
    async fn alert(
        &self,
        collection: &Collection,
        _channel: &str,
        message: &str,
        _fields: &[(String, String)],
    ) -> Result<(), NotifyError> {
        self.alerts
            .lock()
            .unwrap()
            .push((collection.id.clone(), message.to_string()));
        Ok(())
    }
}

/// [`quill::Publisher`] that counts invocations and returns a fixed outcome.
pub struct StubPublisher {
    calls: AtomicUsize,
    published: Mutex<Vec<(CollectionId, CollectionKey)>>,
    ciphertext: Mutex<Option<Vec<u8>>>,
    succeed: bool,
}

impl StubPublisher {
    /// Create a publisher whose publishes succeed.
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            ciphertext: Mutex::new(None),
            succeed: true,
        }
    }

    /// Create a publisher whose publishes fail with a checked error.
    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::succeeding()
        }
    }

    /// Require every publish to decrypt this blob with the offered key.
    /// A key that cannot open it makes the publish return false.
    pub fn require_decrypts(&self, ciphertext: Vec<u8>) {
        *self.ciphertext.lock().unwrap() = Some(ciphertext);
    }

    /// Number of publish invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The (collection id, key) pairs published so far.
    pub fn published(&self) -> Vec<(CollectionId, CollectionKey)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl quill::Publisher for StubPublisher {
    async fn publish(
        &self,
        collection: &Collection,
        key: &CollectionKey,
        _actor: &str,
    ) -> Result<bool, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.published
            .lock()
            .unwrap()
            .push((collection.id.clone(), key.clone()));

        if let Some(ciphertext) = self.ciphertext.lock().unwrap().as_ref() {
            if key.decrypt(ciphertext).is_err() {
                return Ok(false);
            }
        }

        if self.succeed {
            Ok(true)
        } else {
            Err(PublishError("injected publish failure".to_string()))
        }
    }
}
