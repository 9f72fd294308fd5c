//! Error types for the distribution module.

use thiserror::Error;

use quill_core::CollectionId;
use quill_keyring::{AccessError, KeyringError};

use crate::traits::UserStoreError;

/// Errors that can fail a distribution batch outright.
///
/// Per-user failures are not here: they are collected into the batch's
/// [`crate::DistributionReport`] instead.
#[derive(Debug, Error)]
pub enum DistribError {
    /// The caller's keyring holds no key for the collection.
    #[error("source keyring has no key for collection {0}")]
    MissingSourceKey(CollectionId),

    /// Keyring cache failure, including the final barrier write.
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    /// The user store could not even list users.
    #[error("user store error: {0}")]
    UserStore(#[from] UserStoreError),

    /// The permissions resolver failed to produce an entitlement set.
    #[error("access resolver error: {0}")]
    Resolver(#[from] AccessError),
}

/// Result type for distribution operations.
pub type Result<T> = std::result::Result<T, DistribError>;
