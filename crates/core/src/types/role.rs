//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role `{0}`, expected one of: user, storeowner, admin")]
pub struct RoleError(pub String);

/// The role a user acts with.
///
/// `Admin` may mutate any resource; the other roles only act on resource
/// classes that list them, and only on resources they own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A reader who writes reviews.
    #[default]
    User,
    /// Runs one or more stores and lists books in them.
    StoreOwner,
    /// Full access to every resource and to user management.
    Admin,
}

impl Role {
    /// All roles, in privilege order.
    pub const ALL: [Self; 3] = [Self::User, Self::StoreOwner, Self::Admin];

    /// The wire/database name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::StoreOwner => "storeowner",
            Self::Admin => "admin",
        }
    }

    /// Returns `true` for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "storeowner" => Ok(Self::StoreOwner),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert_eq!(
            "publisher".parse::<Role>(),
            Err(RoleError("publisher".to_owned()))
        );
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&Role::StoreOwner).unwrap(),
            "\"storeowner\""
        );
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin());
    }

    #[test]
    fn test_default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
