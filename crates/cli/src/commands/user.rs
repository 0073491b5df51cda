//! User management commands.
//!
//! Registration over HTTP refuses the admin role, so the first admin is
//! created here.
//!
//! # Usage
//!
//! ```bash
//! bookaholic-cli user create -e admin@example.com -n "Admin Name" -p s3cret! -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKAHOLIC_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use bookaholic_api::db::{Database, PgDatabase, create_pool};
use bookaholic_api::error::AppError;
use bookaholic_api::models::{User, UserInput};
use bookaholic_api::services::UserAdminService;
use bookaholic_core::{Role, RoleError};

use super::database_url;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error(transparent)]
    InvalidRole(#[from] RoleError),

    /// The user could not be created (bad input or email taken).
    #[error(transparent)]
    Rejected(#[from] AppError),
}

/// Create a user of `role` in `db`.
///
/// # Errors
///
/// Returns `UserError::InvalidRole` for an unknown role and
/// `UserError::Rejected` for invalid input or a taken email.
pub async fn create_in(
    db: &dyn Database,
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<User, UserError> {
    let role: Role = role.parse()?;
    let user = UserAdminService::new(db)
        .create(UserInput {
            name: Some(name.to_owned()),
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
            role: Some(role),
        })
        .await?;
    Ok(user)
}

/// Create a user in the configured database.
///
/// # Errors
///
/// Returns `UserError` if the database URL is missing, the database is
/// unreachable, or the user is rejected.
pub async fn create(email: &str, name: &str, password: &str, role: &str) -> Result<(), UserError> {
    dotenvy::dotenv().ok();

    let url = database_url().map_err(UserError::MissingEnvVar)?;

    tracing::info!("Connecting to database...");
    let db = PgDatabase::new(create_pool(&url).await?);

    let user = create_in(&db, email, name, password, role).await?;
    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
