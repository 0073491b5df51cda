//! Authentication extractors.
//!
//! The session holds only the user id. Each authenticated request reloads
//! the user, so role changes and deletions take effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bookaholic_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::models::{User, session_keys};
use crate::services::guard::AccessDenied;
use crate::state::AppState;

/// Message returned for requests without a valid session.
pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_owned()))?;

        let user_id: UserId = session
            .get(session_keys::USER_ID)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_owned()))?;

        // A deleted user's session is dead.
        let user = state
            .db()
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_owned()))?;

        set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
        Ok(Self(user))
    }
}

/// Extractor that requires a logged-in admin.
///
/// Other roles are rejected with 403 Forbidden.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AccessDenied::RoleNotPermitted { role: user.role }.into());
        }
        Ok(Self(user))
    }
}

/// Log `user` in on this session.
///
/// The session id is rotated first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &User,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::USER_ID, user.id).await
}

/// Log out: drop all session data.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
