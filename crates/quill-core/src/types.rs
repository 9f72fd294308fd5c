//! Strong type definitions for Quill.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A collection identifier.
///
/// Stable for the lifetime of the collection; also used as the key
/// identifier in user keyrings and the key store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(pub String);

impl CollectionId {
    /// Create a new CollectionId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id is empty (rejected by every keyring operation).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionId({})", self.0)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CollectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A content page URI, e.g. `/economy/2015-09-01/data.json`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentUri(pub String);

impl ContentUri {
    /// Create a new ContentUri.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Get the URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentUri({})", self.0)
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentUri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a collection sits in the review state machine.
///
/// NotStarted → InProgress (submission for review) → Complete (approved)
/// or Error (approval failed). InProgress or Error surviving a process
/// restart is an anomaly that raises an operator alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    NotStarted,
    InProgress,
    Complete,
    Error,
}

impl ApprovalStatus {
    /// True for states that indicate an interrupted operation after restart.
    pub fn needs_operator_attention(&self) -> bool {
        matches!(self, ApprovalStatus::InProgress | ApprovalStatus::Error)
    }

    /// Encode as a stable integer for storage.
    pub fn as_u8(&self) -> u8 {
        match self {
            ApprovalStatus::NotStarted => 0,
            ApprovalStatus::InProgress => 1,
            ApprovalStatus::Complete => 2,
            ApprovalStatus::Error => 3,
        }
    }

    /// Decode from the stored integer.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ApprovalStatus::NotStarted),
            1 => Some(ApprovalStatus::InProgress),
            2 => Some(ApprovalStatus::Complete),
            3 => Some(ApprovalStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::NotStarted => "NOT_STARTED",
            ApprovalStatus::InProgress => "IN_PROGRESS",
            ApprovalStatus::Complete => "COMPLETE",
            ApprovalStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Classifies which key-sharing policy applies to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionOwner {
    PublishingSupport,
    DataVisualisation,
}

impl CollectionOwner {
    /// Encode as a stable integer for storage.
    pub fn as_u8(&self) -> u8 {
        match self {
            CollectionOwner::PublishingSupport => 0,
            CollectionOwner::DataVisualisation => 1,
        }
    }

    /// Decode from the stored integer.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CollectionOwner::PublishingSupport),
            1 => Some(CollectionOwner::DataVisualisation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_id_empty() {
        assert!(CollectionId::new("").is_empty());
        assert!(CollectionId::new("   ").is_empty());
        assert!(!CollectionId::new("economy-q3").is_empty());
    }

    #[test]
    fn test_collection_id_display() {
        let id = CollectionId::new("economy-q3");
        assert_eq!(format!("{}", id), "economy-q3");
        assert_eq!(format!("{:?}", id), "CollectionId(economy-q3)");
    }

    #[test]
    fn test_approval_status_roundtrip() {
        for status in [
            ApprovalStatus::NotStarted,
            ApprovalStatus::InProgress,
            ApprovalStatus::Complete,
            ApprovalStatus::Error,
        ] {
            assert_eq!(ApprovalStatus::from_u8(status.as_u8()), Some(status));
        }
        assert_eq!(ApprovalStatus::from_u8(200), None);
    }

    #[test]
    fn test_operator_attention_states() {
        assert!(ApprovalStatus::InProgress.needs_operator_attention());
        assert!(ApprovalStatus::Error.needs_operator_attention());
        assert!(!ApprovalStatus::NotStarted.needs_operator_attention());
        assert!(!ApprovalStatus::Complete.needs_operator_attention());
    }
}
