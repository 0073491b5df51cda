//! Admin user management.

use bookaholic_core::{Email, UserId};

use crate::db::{Database, PageRequest, Paged, RepositoryError};
use crate::error::AppError;
use crate::models::{NewUser, User, UserChanges, UserInput, UserPatch, optional_text, required_text};
use crate::services::auth::{AuthError, hash_password, validate_password};

fn user_not_found(id: UserId) -> AppError {
    AppError::NotFound(format!("User not found with id of {id}"))
}

fn not_found_as(id: UserId) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => user_not_found(id),
        other => other.into(),
    }
}

/// User management for admins. Callers must already have checked the
/// acting user is an admin.
pub struct UserAdminService<'a> {
    db: &'a dyn Database,
}

impl<'a> UserAdminService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn list(&self, page: PageRequest) -> Result<Paged<User>, AppError> {
        Ok(self.db.list_users(page).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, AppError> {
        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    /// Create a user with any role, including admin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation`/`AppError::Auth` for bad input and a
    /// conflict if the email is taken.
    pub async fn create(&self, input: UserInput) -> Result<User, AppError> {
        let name = required_text("name", input.name, None)?;
        let email = Email::parse(&required_text("email", input.email, None)?)
            .map_err(AuthError::from)?;
        let password = input.password.unwrap_or_default();
        validate_password(&password)?;

        let user = self
            .db
            .create_user(NewUser {
                name,
                email,
                role: input.role.unwrap_or_default(),
                password_hash: hash_password(&password)?,
            })
            .await?;

        tracing::info!(user = %user.id, role = %user.role, "user created by admin");
        Ok(user)
    }

    /// Update a user's name, email, or role.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist and a conflict
    /// if the new email is taken.
    pub async fn update(&self, id: UserId, patch: UserPatch) -> Result<User, AppError> {
        let email = optional_text("email", patch.email, None)?
            .map(|raw| Email::parse(&raw))
            .transpose()
            .map_err(AuthError::from)?;
        let changes = UserChanges {
            name: optional_text("name", patch.name, None)?,
            email,
            role: patch.role,
        };
        if changes.is_empty() {
            return self.get(id).await;
        }

        let user = self
            .db
            .update_user(id, changes)
            .await
            .map_err(not_found_as(id))?;
        tracing::info!(user = %user.id, role = %user.role, "user updated by admin");
        Ok(user)
    }

    /// Delete a user who owns nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist and a conflict
    /// if they still own stores, books, or reviews.
    pub async fn delete(&self, id: UserId) -> Result<(), AppError> {
        self.db.delete_user(id).await.map_err(not_found_as(id))?;
        tracing::info!(user = %id, "user deleted by admin");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookaholic_core::{GeoPoint, Location, Role};

    use super::*;
    use crate::db::{MemoryDatabase, StoreRepository};
    use crate::models::NewStore;

    fn input(email: &str, role: Option<Role>) -> UserInput {
        UserInput {
            name: Some("Someone".to_owned()),
            email: Some(email.to_owned()),
            password: Some("secret1".to_owned()),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_any_role() {
        let db = MemoryDatabase::new();
        let users = UserAdminService::new(&db);

        let admin = users
            .create(input("root@example.com", Some(Role::Admin)))
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);

        let reader = users.create(input("reader@example.com", None)).await.unwrap();
        assert_eq!(reader.role, Role::User);

        assert!(matches!(
            users.create(input("READER@example.com", None)).await,
            Err(AppError::Database(RepositoryError::Conflict(_)))
        ));
        assert_eq!(users.list(PageRequest::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_create_validates() {
        let db = MemoryDatabase::new();
        let users = UserAdminService::new(&db);

        let short = UserInput {
            password: Some("123".to_owned()),
            ..input("a@example.com", None)
        };
        assert!(matches!(users.create(short).await, Err(AppError::Auth(_))));
        assert!(matches!(
            users.create(input("not-an-email", None)).await,
            Err(AppError::Auth(_))
        ));
        let nameless = UserInput {
            name: None,
            ..input("a@example.com", None)
        };
        assert!(matches!(
            users.create(nameless).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_role() {
        let db = MemoryDatabase::new();
        let users = UserAdminService::new(&db);
        let user = users.create(input("a@example.com", None)).await.unwrap();

        let promoted = users
            .update(
                user.id,
                UserPatch {
                    role: Some(Role::StoreOwner),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::StoreOwner);
        assert_eq!(promoted.email, user.email);

        assert!(matches!(
            users.update(UserId::new(999), UserPatch {
                name: Some("Ghost".to_owned()),
                ..UserPatch::default()
            })
            .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_restricted_while_owning() {
        let db = MemoryDatabase::new();
        let users = UserAdminService::new(&db);
        let owner = users
            .create(input("owner@example.com", Some(Role::StoreOwner)))
            .await
            .unwrap();
        let store = db
            .create_store(NewStore {
                name: "Loop Books".to_owned(),
                address: "1 Loop St".to_owned(),
                location: Location {
                    point: GeoPoint::new(-87.6, 41.9),
                    formatted_address: "1 Loop St".to_owned(),
                    street: None,
                    city: None,
                    state: None,
                    zipcode: None,
                    country: None,
                },
                owner: owner.id,
            })
            .await
            .unwrap();

        assert!(matches!(
            users.delete(owner.id).await,
            Err(AppError::Database(RepositoryError::Conflict(_)))
        ));
        db.delete_store(store.id).await.unwrap();
        users.delete(owner.id).await.unwrap();
        assert!(matches!(
            users.get(owner.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            users.delete(owner.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
