//! Authentication service.
//!
//! Password authentication with Argon2id hashes, account self-service, and
//! the password reset flow.

mod error;
pub mod reset;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use bookaholic_core::{Email, Role};

use crate::db::{Database, RepositoryError};
use crate::models::{NewUser, User, UserChanges, optional_text, required_text};
use crate::services::email::{Mailer, password_reset_email};

use reset::{RESET_TOKEN_TTL_MINUTES, hash_reset_token, issue_reset_token, reset_url};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles registration, login, account updates, and password resets.
pub struct AuthService<'a> {
    db: &'a dyn Database,
    mailer: &'a dyn Mailer,
    base_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a dyn Database, mailer: &'a dyn Mailer, base_url: &'a str) -> Self {
        Self {
            db,
            mailer,
            base_url,
        }
    }

    // =========================================================================
    // Registration and Login
    // =========================================================================

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AdminRegistration` for the admin role,
    /// `AuthError::InvalidEmail` or `AuthError::WeakPassword` for bad input, and
    /// `AuthError::EmailAlreadyRegistered` if the email is taken.
    pub async fn register(
        &self,
        name: Option<String>,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        if role.is_admin() {
            return Err(AuthError::AdminRegistration);
        }

        let name = required_text("name", name, None)?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .db
            .create_user(NewUser {
                name,
                email,
                role,
                password_hash,
            })
            .await
            .map_err(map_email_conflict)?;

        tracing::info!(user = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is missing and
    /// `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AuthError> {
        let (Some(email), Some(password)) = (
            email.filter(|e| !e.trim().is_empty()),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingCredentials);
        };

        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = self
            .db
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        Ok(user)
    }

    // =========================================================================
    // Account Self-Service
    // =========================================================================

    /// Update the user's own name and/or email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation`/`InvalidEmail` for bad input and
    /// `AuthError::EmailAlreadyRegistered` if the new email is taken.
    pub async fn update_details(
        &self,
        user: &User,
        name: Option<String>,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let changes = UserChanges {
            name: optional_text("name", name, None)?,
            email: email.map(Email::parse).transpose()?,
            role: None,
        };
        if changes.is_empty() {
            return Ok(user.clone());
        }

        Ok(self
            .db
            .update_user(user.id, changes)
            .await
            .map_err(map_email_conflict)?)
    }

    /// Change the user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectPassword` if `current` does not match and
    /// `AuthError::WeakPassword` if `new` is too short.
    pub async fn update_password(
        &self,
        user: &User,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .db
            .get_password_hash(user.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        verify_password(current, &stored).map_err(|_| AuthError::IncorrectPassword)?;

        validate_password(new)?;
        let password_hash = hash_password(new)?;
        self.db.update_password(user.id, &password_hash).await?;

        tracing::info!(user = %user.id, "password changed");
        Ok(())
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for `email` and send the reset link.
    ///
    /// If the email cannot be delivered the token is cleared again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownEmail` if no user has that email and
    /// `AuthError::Email` if delivery fails.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        let token = issue_reset_token(Utc::now());
        self.db
            .set_reset_token(user.id, Some(token.stored))
            .await?;

        let url = reset_url(self.base_url, &token.raw);
        let delivery = match password_reset_email(&user.email, &user.name, &url, RESET_TOKEN_TTL_MINUTES) {
            Ok(message) => self.mailer.send(message).await,
            Err(e) => Err(e),
        };

        if let Err(e) = delivery {
            tracing::error!(user = %user.id, error = %e, "reset email failed, clearing token");
            self.db.set_reset_token(user.id, None).await?;
            return Err(AuthError::Email(e));
        }

        tracing::info!(user = %user.id, "password reset token issued");
        Ok(())
    }

    /// Consume a raw reset token and set a new password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, used, or
    /// expired, whatever the password. Only for a live token is the password
    /// checked, giving `AuthError::WeakPassword` if it is too short.
    pub async fn reset_password(&self, raw_token: &str, password: &str) -> Result<User, AuthError> {
        let token_hash = hash_reset_token(raw_token);
        // The token decides first: a dead token is rejected whatever the password.
        self.db
            .find_reset_token_user(&token_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .db
            .consume_reset_token(&token_hash, Utc::now(), &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user = %user.id, "password reset");
        Ok(user)
    }
}

fn map_email_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::EmailAlreadyRegistered,
        other => AuthError::Repository(other),
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
