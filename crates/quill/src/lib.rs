//! # Quill
//!
//! The unified API for the Quill publishing system: editorial collections
//! moving through review to an atomic, scheduled publish, with per-
//! collection encryption keys distributed to exactly the users entitled to
//! them.
//!
//! ## Overview
//!
//! - **Collections**: units of in-progress editorial content with three
//!   review trees and an approval state machine
//! - **Keyring**: a process-wide key cache over a durable key store, with a
//!   consistency guard against two keys claiming one collection
//! - **Distribution**: diff-and-distribute reconciliation of per-user key
//!   holdings against entitlements, on a bounded worker pool
//! - **Scheduling**: timed publish triggers that survive restarts via
//!   startup reconciliation from persisted collection state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quill::{Quill, QuillConfig};
//! use quill_store::SqliteStore;
//!
//! async fn example(
//!     users: Arc<dyn quill_distrib::PersistedUserStore>,
//!     sessions: Arc<dyn quill_distrib::SessionDirectory>,
//!     resolver: Arc<dyn quill_keyring::AccessResolver>,
//!     publisher: Arc<dyn quill::Publisher>,
//!     notifier: Arc<dyn quill::Notifier>,
//! ) {
//!     let store = Arc::new(SqliteStore::open("quill.db").unwrap());
//!
//!     let quill = Quill::new(
//!         store.clone(),
//!         store,
//!         users,
//!         sessions,
//!         resolver,
//!         publisher,
//!         notifier,
//!         QuillConfig::default(),
//!     )
//!     .await
//!     .unwrap();
//!
//!     // Rebuild scheduled publishes and alert on interrupted approvals.
//!     let report = quill.startup().await.unwrap();
//!     println!("re-scheduled {} publishes", report.scheduled);
//! }
//! ```

pub mod error;
pub mod lifecycle;
pub mod scheduler;
pub mod service;

pub use error::{QuillError, Result};
pub use lifecycle::CollectionLifecycle;
pub use scheduler::{
    JobState, Notifier, NotifyError, PublishError, PublishScheduler, Publisher, ReconcileReport,
    SchedulerConfig,
};
pub use service::{Quill, QuillConfig};

// Re-export the component crates under a stable façade.
pub use quill_core as core;
pub use quill_distrib as distrib;
pub use quill_keyring as keyring;
pub use quill_store as store;
