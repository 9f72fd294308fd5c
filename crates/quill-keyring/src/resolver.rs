//! Permissions collaborator.
//!
//! The access resolver computes, for a given collection, the set of users
//! entitled to its key based on team membership and role. It is consumed
//! here and by key distribution, never implemented by this core.
//!
//! Implementations must be callable without holding any lock owned by this
//! core.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use quill_core::Collection;

/// Failure from the permissions resolver.
#[derive(Debug, Error)]
#[error("access resolver: {0}")]
pub struct AccessError(pub String);

/// Result type for resolver calls.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Computes who should hold a collection's key.
///
/// Entitlement sets are derived, never cached across permission changes:
/// callers recompute on every distribution pass.
#[async_trait]
pub trait AccessResolver: Send + Sync {
    /// The emails of every user entitled to the collection's key right now.
    async fn entitled_users(&self, collection: &Collection) -> Result<HashSet<String>>;

    /// Whether the user may read the collection's content.
    async fn has_access(&self, email: &str, collection: &Collection) -> Result<bool>;

    /// Whether the user may edit the collection.
    async fn can_edit(&self, email: &str, collection: &Collection) -> Result<bool>;

    /// Whether the user is a system administrator.
    async fn is_administrator(&self, email: &str) -> Result<bool>;

    /// Whether the user has the global edit capability. Used by the
    /// application-key policy, which grants shared backend keys to
    /// administrators and editors only.
    async fn is_editor(&self, email: &str) -> Result<bool>;
}
