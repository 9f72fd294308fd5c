//! Collaborator traits consumed by key distribution.
//!
//! The persisted user store and the session directory live outside this
//! core; their persistence formats are implementation details. In-memory
//! test doubles live in quill-testkit.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use quill_core::{CollectionKey, User};
use quill_keyring::UserKeyring;

/// Failure from the persisted user store.
///
/// Treated as per-user and non-fatal during a distribution batch.
#[derive(Debug, Error)]
#[error("user store: {0}")]
pub struct UserStoreError(pub String);

/// Durable per-user keyring storage.
#[async_trait]
pub trait PersistedUserStore: Send + Sync {
    /// Every known user.
    async fn list(&self) -> Result<Vec<User>, UserStoreError>;

    /// Look up one user.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    /// Write a key into a user's persisted keyring.
    async fn add_key_to_keyring(
        &self,
        email: &str,
        id: &str,
        key: &CollectionKey,
    ) -> Result<(), UserStoreError>;

    /// Remove a key from a user's persisted keyring.
    async fn remove_key_from_keyring(&self, email: &str, id: &str) -> Result<(), UserStoreError>;
}

/// A logged-in user's session, carrying their unlocked in-memory keyring.
///
/// Distribution also mutates this keyring so the change is visible to the
/// user without re-login.
#[derive(Clone)]
pub struct Session {
    pub email: String,
    pub keyring: Arc<Mutex<UserKeyring>>,
}

impl Session {
    /// Create a session holding the given keyring.
    pub fn new(email: impl Into<String>, keyring: UserKeyring) -> Self {
        Self {
            email: email.into(),
            keyring: Arc::new(Mutex::new(keyring)),
        }
    }
}

/// Lookup of active sessions by email.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// The user's active session, if they are logged in.
    async fn find_active_session(&self, email: &str) -> Option<Session>;
}
