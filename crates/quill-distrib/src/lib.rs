//! # Quill Distrib
//!
//! Key distribution: keeping each user's key holdings consistent with the
//! access resolver's entitlement set as permissions and collection
//! membership change.
//!
//! ## Overview
//!
//! Whenever a collection's membership or key changes, the
//! [`KeyDistributor`] diffs the set of known users against the entitled set
//! and grants or revokes the collection key per user. Per-user work runs
//! concurrently on a bounded [`WorkerPool`]; the final write into the
//! scheduler-facing keyring cache is a strict barrier that happens only
//! after every per-user task has finished or failed.
//!
//! ## Failure model
//!
//! Per-user failures never abort a batch: a single held-up user must not
//! block scheduled publication for everyone else. Failures are collected
//! into a [`DistributionReport`] for the caller instead of being lost.

pub mod distributor;
pub mod error;
pub mod pool;
pub mod traits;

pub use distributor::{
    DistributionReport, KeyAction, KeyDistributor, KeyTask, UserFailure,
};
pub use error::{DistribError, Result};
pub use pool::{WorkerPool, DEFAULT_WORKER_PERMITS};
pub use traits::{PersistedUserStore, Session, SessionDirectory, UserStoreError};
