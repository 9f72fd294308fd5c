//! Error types for Quill core.

use thiserror::Error;

use crate::types::ApprovalStatus;

/// Core errors over collection and key primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("invalid approval transition: {from} -> {to}")]
    InvalidTransition {
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    #[error("content uri {0} present in more than one tree")]
    TreeConflict(String),

    #[error("invalid key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
