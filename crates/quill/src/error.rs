//! Error types for the Quill facade.

use thiserror::Error;

use quill_core::{CollectionId, ContentUri, CoreError};
use quill_distrib::DistribError;
use quill_keyring::{AccessError, KeyringError};
use quill_store::StoreError;

/// Errors that can occur during lifecycle and scheduling operations.
#[derive(Debug, Error)]
pub enum QuillError {
    /// Domain-level error (state machine, trees, key material).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Keyring error.
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    /// Distribution error.
    #[error("distribution error: {0}")]
    Distrib(#[from] DistribError),

    /// Permissions resolver error.
    #[error("access resolver error: {0}")]
    Resolver(#[from] AccessError),

    /// Collection not found.
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// Collection already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(CollectionId),

    /// The content URI is claimed by another collection's working trees.
    /// Retryable: a caller racing another edit should surface this as a
    /// conflict, not a data-model failure.
    #[error("uri {uri} is claimed by collection {held_by}")]
    BlockingChange {
        uri: ContentUri,
        held_by: CollectionId,
    },

    /// Approval requested while content is still awaiting review.
    #[error("collection {0} has unreviewed content")]
    ContentNotReviewed(CollectionId),

    /// Scheduling requested for a collection with no publish date.
    #[error("collection {0} has no publish date")]
    PublishDateMissing(CollectionId),

    /// Scheduling requested for a publish date already in the past.
    #[error("publish date for collection {0} is in the past")]
    ScheduleInPast(CollectionId),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, QuillError>;
