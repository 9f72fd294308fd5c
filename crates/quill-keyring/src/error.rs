//! Error types for the keyring module.

use thiserror::Error;

use quill_core::CollectionId;
use quill_store::StoreError;

use crate::resolver::AccessError;

/// Errors that can occur during keyring operations.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// Empty or nil argument - a caller bug, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Expected key absent from the persistent store, usually a missing
    /// distribution step.
    #[error("key not found for collection {0}")]
    KeyNotFound(CollectionId),

    /// Two different key values claimed for one collection id. Always fatal
    /// to the operation and never auto-resolved: either resolution could
    /// destroy access to content.
    #[error("key mismatch for collection {0}")]
    KeyMismatch(CollectionId),

    /// A locked user keyring was asked to read or mutate.
    #[error("user keyring is locked")]
    KeyringLocked,

    /// I/O failure reading/writing the persistent store, propagated
    /// unmodified.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The permissions resolver failed.
    #[error("access resolver error: {0}")]
    Resolver(#[from] AccessError),
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;
