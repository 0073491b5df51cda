//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookaholic_core::{Email, Role, UserId};

/// A registered user.
///
/// Credentials and reset-token state live only in storage and are never part
/// of this type, so they cannot leak through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A user to be inserted, with an already-hashed password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub password_hash: String,
}

/// Field changes for a user. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<Role>,
}

impl UserChanges {
    /// Returns `true` if no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

/// Persisted half of a password reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    /// SHA-256 hex digest of the raw token.
    pub hash: String,
    /// Instant after which the token no longer matches.
    pub expires_at: DateTime<Utc>,
}

/// Request body for an admin creating a user of any role.
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Request body for an admin updating a user.
#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}
