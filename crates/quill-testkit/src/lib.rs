//! # Quill Testkit
//!
//! Testing utilities for the Quill workspace: in-memory collaborator stubs,
//! a wired-up fixture, and proptest generators.
//!
//! The stubs here implement the collaborator traits the core consumes
//! ([`quill_keyring::AccessResolver`], [`quill_distrib::PersistedUserStore`],
//! [`quill_distrib::SessionDirectory`], [`quill::Notifier`],
//! [`quill::Publisher`]) with deterministic in-memory behavior and optional
//! failure injection.

pub mod fixtures;
pub mod generators;
pub mod stubs;

pub use fixtures::{make_collection, random_collection_id, TestFixture};
pub use stubs::{
    InMemorySessionDirectory, InMemoryUserStore, RecordingNotifier, StaticAccessResolver,
    StubPublisher,
};
