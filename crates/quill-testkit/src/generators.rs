//! Proptest strategies for Quill domain values.

use proptest::prelude::*;

use quill_core::{ApprovalStatus, Collection, CollectionId, CollectionKey, CollectionOwner, ContentUri, TreeKind};

/// Strategy for non-empty collection ids.
pub fn collection_id() -> impl Strategy<Value = CollectionId> {
    "[a-z][a-z0-9-]{0,30}".prop_map(CollectionId::new)
}

/// Strategy for content URIs.
pub fn content_uri() -> impl Strategy<Value = ContentUri> {
    "(/[a-z][a-z0-9-]{0,12}){1,4}/data\\.json".prop_map(ContentUri::new)
}

/// Strategy for collection keys.
pub fn collection_key() -> impl Strategy<Value = CollectionKey> {
    any::<[u8; 32]>().prop_map(CollectionKey::from_bytes)
}

/// Strategy for approval states.
pub fn approval_status() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::NotStarted),
        Just(ApprovalStatus::InProgress),
        Just(ApprovalStatus::Complete),
        Just(ApprovalStatus::Error),
    ]
}

/// Strategy for tree kinds.
pub fn tree_kind() -> impl Strategy<Value = TreeKind> {
    prop_oneof![
        Just(TreeKind::InProgress),
        Just(TreeKind::Complete),
        Just(TreeKind::Reviewed),
    ]
}

/// Strategy for collections with consistent trees.
pub fn collection() -> impl Strategy<Value = Collection> {
    (
        collection_id(),
        "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,12}){0,2}",
        prop::collection::vec((content_uri(), tree_kind()), 0..8),
        prop::option::of(1i64..4_000_000_000_000),
    )
        .prop_map(|(id, name, uris, publish_date)| {
            let mut c = Collection::new(id, name, CollectionOwner::PublishingSupport);
            for (uri, tree) in uris {
                c.add_uri(uri, tree);
            }
            c.publish_date = publish_date;
            c
        })
}
