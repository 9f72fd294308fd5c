//! Collections and their content trees.
//!
//! A collection tracks the content URIs it is editing in three trees:
//! in-progress, complete, and reviewed. A URI lives in exactly one tree or
//! none; moving content between review stages moves the URI. The approval
//! state machine gates publication.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{ApprovalStatus, CollectionId, CollectionOwner, ContentUri};

/// Which of a collection's three content trees a URI lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeKind {
    InProgress,
    Complete,
    Reviewed,
}

/// A unit of in-progress editorial content moving through review to
/// publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Unique, stable identifier.
    pub id: CollectionId,
    /// Human-readable name.
    pub name: String,
    /// Where the collection sits in the review state machine.
    pub approval_status: ApprovalStatus,
    /// Whether working content is encrypted at rest.
    pub is_encrypted: bool,
    /// Which key-sharing policy applies.
    pub owner: CollectionOwner,
    /// URIs currently being edited.
    pub in_progress: BTreeSet<ContentUri>,
    /// URIs whose edits are finished but not yet reviewed.
    pub complete: BTreeSet<ContentUri>,
    /// URIs that passed review.
    pub reviewed: BTreeSet<ContentUri>,
    /// Scheduled publish time (Unix ms). None means manual publish only.
    pub publish_date: Option<i64>,
}

impl Collection {
    /// Create a new collection in the NotStarted state.
    pub fn new(id: CollectionId, name: impl Into<String>, owner: CollectionOwner) -> Self {
        Self {
            id,
            name: name.into(),
            approval_status: ApprovalStatus::NotStarted,
            is_encrypted: true,
            owner,
            in_progress: BTreeSet::new(),
            complete: BTreeSet::new(),
            reviewed: BTreeSet::new(),
            publish_date: None,
        }
    }

    /// Set the scheduled publish time.
    pub fn with_publish_date(mut self, publish_date_ms: i64) -> Self {
        self.publish_date = Some(publish_date_ms);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Trees
    // ─────────────────────────────────────────────────────────────────────────

    /// Which tree holds the given URI, if any.
    pub fn tree_of(&self, uri: &ContentUri) -> Option<TreeKind> {
        if self.in_progress.contains(uri) {
            Some(TreeKind::InProgress)
        } else if self.complete.contains(uri) {
            Some(TreeKind::Complete)
        } else if self.reviewed.contains(uri) {
            Some(TreeKind::Reviewed)
        } else {
            None
        }
    }

    /// True if any tree holds the given URI.
    pub fn contains_uri(&self, uri: &ContentUri) -> bool {
        self.tree_of(uri).is_some()
    }

    /// Place a URI into a tree, removing it from any other tree first so
    /// the one-tree invariant holds.
    pub fn add_uri(&mut self, uri: ContentUri, tree: TreeKind) {
        self.in_progress.remove(&uri);
        self.complete.remove(&uri);
        self.reviewed.remove(&uri);
        self.tree_mut(tree).insert(uri);
    }

    fn tree_mut(&mut self, tree: TreeKind) -> &mut BTreeSet<ContentUri> {
        match tree {
            TreeKind::InProgress => &mut self.in_progress,
            TreeKind::Complete => &mut self.complete,
            TreeKind::Reviewed => &mut self.reviewed,
        }
    }

    /// Remove a URI from whichever tree holds it.
    pub fn remove_uri(&mut self, uri: &ContentUri) -> bool {
        self.in_progress.remove(uri) || self.complete.remove(uri) || self.reviewed.remove(uri)
    }

    /// Move a URI to the next review stage. Same as [`Collection::add_uri`]
    /// but fails if the URI is not already claimed by this collection.
    pub fn transfer_uri(&mut self, uri: &ContentUri, to: TreeKind) -> Result<()> {
        if !self.contains_uri(uri) {
            return Err(CoreError::InvalidInput("uri not present in any tree"));
        }
        self.add_uri(uri.clone(), to);
        Ok(())
    }

    /// Iterate every URI claimed by this collection, across all trees.
    pub fn all_uris(&self) -> impl Iterator<Item = &ContentUri> {
        self.in_progress
            .iter()
            .chain(self.complete.iter())
            .chain(self.reviewed.iter())
    }

    /// Verify the one-tree invariant. A URI in more than one tree is a
    /// defect introduced by external mutation of the public fields.
    pub fn validate_trees(&self) -> Result<()> {
        for uri in self.in_progress.iter() {
            if self.complete.contains(uri) || self.reviewed.contains(uri) {
                return Err(CoreError::TreeConflict(uri.as_str().to_string()));
            }
        }
        for uri in self.complete.iter() {
            if self.reviewed.contains(uri) {
                return Err(CoreError::TreeConflict(uri.as_str().to_string()));
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Approval State Machine
    // ─────────────────────────────────────────────────────────────────────────

    /// NotStarted → InProgress, on submission for review.
    pub fn begin_review(&mut self) -> Result<()> {
        self.transition(ApprovalStatus::NotStarted, ApprovalStatus::InProgress)
    }

    /// InProgress → Complete, on approval.
    pub fn mark_approved(&mut self) -> Result<()> {
        self.transition(ApprovalStatus::InProgress, ApprovalStatus::Complete)
    }

    /// Any state → Error, when approval processing fails.
    pub fn mark_error(&mut self) {
        self.approval_status = ApprovalStatus::Error;
    }

    /// Complete → NotStarted, returning an approved collection to editing.
    pub fn unlock(&mut self) -> Result<()> {
        self.transition(ApprovalStatus::Complete, ApprovalStatus::NotStarted)
    }

    fn transition(&mut self, from: ApprovalStatus, to: ApprovalStatus) -> Result<()> {
        if self.approval_status != from {
            return Err(CoreError::InvalidTransition {
                from: self.approval_status,
                to,
            });
        }
        self.approval_status = to;
        Ok(())
    }

    /// True if the collection has a publish date later than `now_ms`.
    pub fn has_future_publish_date(&self, now_ms: i64) -> bool {
        self.publish_date.map(|d| d > now_ms).unwrap_or(false)
    }
}
