//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::email::EmailError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] bookaholic_core::EmailError),

    /// Login attempted without an email or password.
    #[error("Please provide an email and password")]
    MissingCredentials,

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The current password supplied for a password change is wrong.
    #[error("Password is incorrect")]
    IncorrectPassword,

    /// The email address is already registered.
    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    /// Self-registration as an admin was attempted.
    #[error("Cannot register with the admin role")]
    AdminRegistration,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Password reset requested for an unknown address.
    #[error("There is no user with that email")]
    UnknownEmail,

    /// Reset token unknown, already used, or expired.
    #[error("Invalid token")]
    InvalidResetToken,

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The reset email could not be delivered.
    #[error("Email could not be sent")]
    Email(#[source] EmailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
