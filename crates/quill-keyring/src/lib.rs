//! # Quill Keyring
//!
//! Key custody for collection encryption keys:
//!
//! - [`KeyringCache`] - the process-wide collection id → key mapping, backed
//!   by a durable [`quill_store::KeyStore`], enforcing at-most-one key value
//!   per collection id for the lifetime of the process
//! - [`UserKeyring`] - a user's private key mapping with a lock state
//! - [`Keyring`] - the permission-checked access façade handed to inbound
//!   operations
//! - [`AccessResolver`] - the permissions collaborator consumed by the
//!   façade and by key distribution
//!
//! ## The mismatch guard
//!
//! Two legitimate code paths can attempt to materialize a key for the same
//! collection: a direct user action and asynchronous key distribution. If
//! they ever disagree, silently overwriting would risk content becoming
//! permanently undecryptable if the wrong key wins the race, so the cache
//! fails the operation with [`KeyringError::KeyMismatch`] and mutates
//! nothing.

pub mod cache;
pub mod error;
pub mod facade;
pub mod resolver;
pub mod user;

pub use cache::KeyringCache;
pub use error::{KeyringError, Result};
pub use facade::Keyring;
pub use resolver::{AccessError, AccessResolver};
pub use user::{LockState, UserKeyring};
