//! Per-user keyrings.
//!
//! A user's private mapping of collection/application id → key, protected
//! by the user's credentials (credential handling lives outside this core).
//! The keyring may only be read or mutated while unlocked.

use std::collections::BTreeMap;

use quill_core::CollectionKey;

use crate::error::{KeyringError, Result};

/// Lock state of a user keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// A user's private keyring.
#[derive(Debug, Clone)]
pub struct UserKeyring {
    state: LockState,
    keys: BTreeMap<String, CollectionKey>,
}

impl UserKeyring {
    /// Create an empty, unlocked keyring.
    pub fn new() -> Self {
        Self {
            state: LockState::Unlocked,
            keys: BTreeMap::new(),
        }
    }

    /// Current lock state.
    pub fn state(&self) -> LockState {
        self.state
    }

    /// True if the keyring is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::Unlocked
    }

    /// Lock the keyring. Further reads and mutations fail until unlocked.
    pub fn lock(&mut self) {
        self.state = LockState::Locked;
    }

    /// Unlock the keyring.
    pub fn unlock(&mut self) {
        self.state = LockState::Unlocked;
    }

    /// Store a key under a collection or application id.
    pub fn put(&mut self, id: impl Into<String>, key: CollectionKey) -> Result<()> {
        self.require_unlocked()?;
        self.keys.insert(id.into(), key);
        Ok(())
    }

    /// Get the key for an id.
    pub fn get(&self, id: &str) -> Result<Option<&CollectionKey>> {
        self.require_unlocked()?;
        Ok(self.keys.get(id))
    }

    /// Remove the key for an id. Returns true if an entry was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        self.require_unlocked()?;
        Ok(self.keys.remove(id).is_some())
    }

    /// Iterate the (id, key) entries.
    pub fn entries(&self) -> Result<impl Iterator<Item = (&String, &CollectionKey)>> {
        self.require_unlocked()?;
        Ok(self.keys.iter())
    }

    /// The ids held by this keyring.
    pub fn list(&self) -> Result<Vec<&str>> {
        self.require_unlocked()?;
        Ok(self.keys.keys().map(String::as_str).collect())
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn require_unlocked(&self) -> Result<()> {
        match self.state {
            LockState::Unlocked => Ok(()),
            LockState::Locked => Err(KeyringError::KeyringLocked),
        }
    }
}

impl Default for UserKeyring {
    fn default() -> Self {
        Self::new()
    }
}
