//! Test fixtures and helpers.
//!
//! Common setup code wiring a full Quill service over in-memory stores and
//! stub collaborators.

use std::sync::Arc;

use rand::Rng;

use quill::{Quill, QuillConfig};
use quill_core::{Collection, CollectionId, CollectionOwner, User};
use quill_store::MemoryStore;

use crate::stubs::{
    InMemorySessionDirectory, InMemoryUserStore, RecordingNotifier, StaticAccessResolver,
    StubPublisher,
};

/// A fully wired Quill service over in-memory stores and stubs.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub users: Arc<InMemoryUserStore>,
    pub sessions: Arc<InMemorySessionDirectory>,
    pub resolver: Arc<StaticAccessResolver>,
    pub publisher: Arc<StubPublisher>,
    pub notifier: Arc<RecordingNotifier>,
    pub quill: Quill,
}

impl TestFixture {
    /// Create a fixture with a succeeding publisher.
    pub async fn new() -> Self {
        Self::with_publisher(StubPublisher::succeeding()).await
    }

    /// Create a fixture with a specific publisher stub.
    pub async fn with_publisher(publisher: StubPublisher) -> Self {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let sessions = Arc::new(InMemorySessionDirectory::new());
        let resolver = Arc::new(StaticAccessResolver::new());
        let publisher = Arc::new(publisher);
        let notifier = Arc::new(RecordingNotifier::new());

        let quill = Quill::new(
            store.clone(),
            store.clone(),
            users.clone(),
            sessions.clone(),
            resolver.clone(),
            publisher.clone(),
            notifier.clone(),
            QuillConfig::default(),
        )
        .await
        .expect("fixture construction");

        Self {
            store,
            users,
            sessions,
            resolver,
            publisher,
            notifier,
            quill,
        }
    }

    /// Register a user who can edit and is entitled to every collection.
    pub fn add_editor(&self, email: &str) -> User {
        let user = User::new(email, email.split('@').next().unwrap_or(email));
        self.users.add_user(user.clone());
        self.resolver.entitle(email);
        user
    }

    /// Register a plain user with no entitlements.
    pub fn add_viewer(&self, email: &str) -> User {
        let user = User::new(email, email.split('@').next().unwrap_or(email));
        self.users.add_user(user.clone());
        user
    }
}

/// Build a bare collection for tests that don't need the full service.
pub fn make_collection(id: &str) -> Collection {
    Collection::new(
        CollectionId::new(id),
        format!("Collection {}", id),
        CollectionOwner::PublishingSupport,
    )
}

/// A random collection id, for tests that need uniqueness.
pub fn random_collection_id() -> CollectionId {
    let n: u64 = rand::thread_rng().gen();
    CollectionId::new(format!("collection-{:016x}", n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_keyring::UserKeyring;

    #[tokio::test]
    async fn test_fixture_distributes_on_create() {
        let fixture = TestFixture::new().await;
        fixture.add_editor("editor@example.com");
        fixture.add_viewer("viewer@example.com");

        let mut keyring = UserKeyring::new();
        let collection = fixture
            .quill
            .create_collection(
                &mut keyring,
                CollectionId::new("economy-q3"),
                "Economy Q3",
                CollectionOwner::PublishingSupport,
            )
            .await
            .unwrap();

        assert!(fixture
            .users
            .holds_key("editor@example.com", collection.id.as_str()));
        assert!(!fixture
            .users
            .holds_key("viewer@example.com", collection.id.as_str()));
    }

    #[tokio::test]
    async fn test_entitlement_change_revokes_on_redistribution() {
        let fixture = TestFixture::new().await;
        fixture.add_editor("editor@example.com");
        fixture.add_editor("departing@example.com");

        let mut keyring = UserKeyring::new();
        let collection = fixture
            .quill
            .create_collection(
                &mut keyring,
                CollectionId::new("economy-q3"),
                "Economy Q3",
                CollectionOwner::PublishingSupport,
            )
            .await
            .unwrap();
        assert!(fixture
            .users
            .holds_key("departing@example.com", collection.id.as_str()));

        fixture.resolver.revoke("departing@example.com");
        fixture
            .quill
            .distribute_collection_key(&keyring, &collection.id, false)
            .await
            .unwrap();

        assert!(!fixture
            .users
            .holds_key("departing@example.com", collection.id.as_str()));
        assert!(fixture
            .users
            .holds_key("editor@example.com", collection.id.as_str()));
    }

    #[test]
    fn test_random_ids_are_distinct() {
        assert_ne!(random_collection_id(), random_collection_id());
    }

    #[test]
    fn test_collection_serde_roundtrip() {
        let mut collection = make_collection("economy-q3");
        collection.add_uri(
            quill_core::ContentUri::from("/economy/gdp/data.json"),
            quill_core::TreeKind::Reviewed,
        );

        let json = serde_json::to_string(&collection).unwrap();
        let back: Collection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, collection.id);
        assert_eq!(back.reviewed, collection.reviewed);
    }
}
