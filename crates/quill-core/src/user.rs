//! Users known to the publishing system.

use serde::{Deserialize, Serialize};

/// A user who may hold collection keys.
///
/// `has_keyring` is false until the user's persisted keyring has been
/// materialized (first login); key distribution skips such users rather
/// than treating them as failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub has_keyring: bool,
}

impl User {
    /// Create a user with a materialized keyring.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            has_keyring: true,
        }
    }

    /// Create a user whose keyring has not yet been materialized.
    pub fn without_keyring(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            has_keyring: false,
        }
    }
}
