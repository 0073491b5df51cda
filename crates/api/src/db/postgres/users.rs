//! User queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookaholic_core::{Email, Role, UserId};

use super::{PgDatabase, is_foreign_key_violation, is_unique_violation, limit_offset};
use crate::db::memory::{DUPLICATE_EMAIL, USER_OWNS_RESOURCES};
use crate::db::{PageRequest, Paged, RepositoryError, UserRepository};
use crate::models::{NewUser, ResetToken, User, UserChanges};

const USER_COLUMNS: &str = "id, name, email, role, created_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row.role.parse::<Role>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            role,
            created_at: row.created_at,
        })
    }
}

fn map_email_conflict(e: sqlx::Error) -> RepositoryError {
    if is_unique_violation(&e) {
        return RepositoryError::Conflict(DUPLICATE_EMAIL.to_owned());
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl UserRepository for PgDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, role, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(map_email_conflict)?;

        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(hash)
    }

    async fn list_users(&self, page: PageRequest) -> Result<Paged<User>, RepositoryError> {
        let total = self.count("users").await?;
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;
        Ok(Paged { items, total, page })
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 role = COALESCE($4, role)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email.as_ref().map(Email::as_str))
        .bind(changes.role.map(Role::as_str))
        .fetch_optional(self.pool())
        .await
        .map_err(map_email_conflict)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return RepositoryError::Conflict(USER_OWNS_RESOURCES.to_owned());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: Option<ResetToken>,
    ) -> Result<(), RepositoryError> {
        let (hash, expires_at) = token.map(|t| (t.hash, t.expires_at)).unzip();
        let result = sqlx::query(
            "UPDATE users
             SET reset_password_token = $2, reset_password_expires = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .bind(expires_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_reset_token_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let id: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM users
             WHERE reset_password_token = $1 AND reset_password_expires > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(id.map(UserId::new))
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        // Single statement: a token can only ever match one UPDATE.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET password_hash = $3,
                 reset_password_token = NULL,
                 reset_password_expires = NULL
             WHERE reset_password_token = $1 AND reset_password_expires > $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token_hash)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
