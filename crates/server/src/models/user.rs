//! User domain types.

use orderly_core::{Email, Patch, UserId};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name (not unique).
    pub username: String,
    /// Email address (unique).
    pub email: Email,
    /// Free-form description.
    pub description: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub username: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<Email>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
}

/// Equality filter for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<Email>,
}

impl UserFilter {
    /// Returns `true` if `user` satisfies every set field.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.username.as_ref().is_none_or(|u| *u == user.username)
            && self.email.as_ref().is_none_or(|e| *e == user.email)
    }
}
