//! # Quill Core
//!
//! Pure domain primitives for the Quill publishing system: collections,
//! content trees, approval states, and collection encryption keys.
//!
//! This crate contains no I/O, no storage, no scheduling. It is pure
//! computation over editorial data structures.
//!
//! ## Key Types
//!
//! - [`Collection`] - A unit of in-progress editorial content moving through
//!   review to publication
//! - [`CollectionId`] - Stable identifier for a collection
//! - [`CollectionKey`] - The symmetric key protecting a collection's content
//! - [`ApprovalStatus`] - Where a collection sits in the review state machine
//!
//! ## Content Trees
//!
//! Each collection tracks its content URIs in three trees (in-progress,
//! complete, reviewed). A URI lives in exactly one tree or none; moving
//! content between review stages moves the URI between trees.

pub mod collection;
pub mod crypto;
pub mod error;
pub mod types;
pub mod user;

pub use collection::{Collection, TreeKind};
pub use crypto::{CollectionKey, KEY_SIZE, NONCE_SIZE};
pub use error::CoreError;
pub use types::{ApprovalStatus, CollectionId, CollectionOwner, ContentUri};
pub use user::User;

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
