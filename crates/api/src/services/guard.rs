//! Ownership authorization for stores, books, and reviews.
//!
//! One rule covers every mutable resource: an admin may mutate anything;
//! anyone else must own the resource *and* hold a role the resource class
//! allows. Creation is gated by the same role sets.
//!
//! Callers check that the resource exists before consulting the guard, so a
//! missing resource reports 404 even to a principal who could never mutate
//! it.

use std::fmt;

use thiserror::Error;

use bookaholic_core::{Role, UserId};

use crate::models::User;

/// A resource class subject to ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Store,
    Book,
    Review,
}

impl Resource {
    /// Roles that may create, update, or delete this class of resource.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::Store | Self::Book => &[Role::StoreOwner, Role::Admin],
            Self::Review => &[Role::User, Role::Admin],
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Book => "book",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Why a mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// The principal's role may not touch this resource class (403).
    #[error("User role {role} is not authorized to access this route")]
    RoleNotPermitted { role: Role },

    /// The principal does not own the resource (401).
    #[error("User {user} is not authorized to {action} this {resource}")]
    NotOwner {
        user: UserId,
        action: Action,
        resource: Resource,
    },
}

/// Decide whether `acting_user` may mutate a resource owned by `resource_owner`.
///
/// Permits when `acting_role` is admin, or when the actor owns the resource
/// and `acting_role` is in `allowed_roles`.
#[must_use]
pub fn can_mutate(
    acting_user: UserId,
    resource_owner: UserId,
    acting_role: Role,
    allowed_roles: &[Role],
) -> bool {
    acting_role.is_admin()
        || (acting_user == resource_owner && allowed_roles.contains(&acting_role))
}

fn role_permitted(role: Role, resource: Resource) -> bool {
    role.is_admin() || resource.allowed_roles().contains(&role)
}

/// Authorize creating a new resource of class `resource`.
///
/// # Errors
///
/// Returns `AccessDenied::RoleNotPermitted` if the user's role is not allowed.
pub fn authorize_create(user: &User, resource: Resource) -> Result<(), AccessDenied> {
    if role_permitted(user.role, resource) {
        Ok(())
    } else {
        Err(AccessDenied::RoleNotPermitted { role: user.role })
    }
}

/// Authorize updating or deleting an existing resource owned by `owner`.
///
/// # Errors
///
/// Returns `AccessDenied::RoleNotPermitted` if the role is not allowed for the
/// resource class, otherwise `AccessDenied::NotOwner` if the user does not own
/// the resource.
pub fn authorize_mutation(
    user: &User,
    owner: UserId,
    resource: Resource,
    action: Action,
) -> Result<(), AccessDenied> {
    if can_mutate(user.id, owner, user.role, resource.allowed_roles()) {
        return Ok(());
    }

    if !role_permitted(user.role, resource) {
        return Err(AccessDenied::RoleNotPermitted { role: user.role });
    }

    tracing::debug!(user = %user.id, owner = %owner, %resource, %action, "mutation denied");
    Err(AccessDenied::NotOwner {
        user: user.id,
        action,
        resource,
    })
}
