//! Authentication route handlers.
//!
//! Registration, login/logout, account self-service, and the password
//! reset flow. Logging in stores the user id in the session cookie.

use axum::{Router, extract::State, response::Response, routing::{get, post, put}};
use serde::Deserialize;
use tower_sessions::Session;

use bookaholic_core::Role;

use super::{ApiJson, ApiPath, created, ok};
use crate::error::AppError;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::User;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/updatedetails", put(update_details))
        .route("/updatepassword", put(update_password))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/{token}", put(reset_password))
}

// =============================================================================
// Request Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Account details update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Password change request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Forgot password request body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// Reset password request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

async fn log_in(session: &Session, user: &User) -> Result<(), AppError> {
    set_current_user(session, user).await.map_err(|e| {
        tracing::error!(error = %e, "failed to store session");
        AppError::Internal("Failed to store session".to_owned())
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account and log it in.
///
/// # Errors
///
/// Returns 400 for invalid input, a taken email, or the admin role.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let user = state
        .auth()
        .register(
            body.name,
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
            body.role.unwrap_or_default(),
        )
        .await?;
    log_in(&session, &user).await?;
    Ok(created(user))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns 400 if a field is missing and 401 for wrong credentials.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let user = state
        .auth()
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;
    log_in(&session, &user).await?;
    tracing::info!(user = %user.id, "user logged in");
    Ok(ok(user))
}

/// Log out by clearing the session.
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<Response, AppError> {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "failed to clear session");
        return Err(AppError::Internal("Failed to clear session".to_owned()));
    }
    Ok(ok(serde_json::json!({})))
}

/// The logged-in user.
#[allow(clippy::unused_async)]
pub async fn me(RequireAuth(user): RequireAuth) -> Response {
    ok(user)
}

/// Update the logged-in user's name and/or email.
///
/// # Errors
///
/// Returns 400 for invalid input or a taken email.
pub async fn update_details(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<UpdateDetailsRequest>,
) -> Result<Response, AppError> {
    let user = state
        .auth()
        .update_details(&user, body.name, body.email.as_deref())
        .await?;
    Ok(ok(user))
}

/// Change the logged-in user's password.
///
/// # Errors
///
/// Returns 401 if the current password is wrong and 400 if the new one is
/// too short.
pub async fn update_password(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> Result<Response, AppError> {
    state
        .auth()
        .update_password(
            &user,
            body.current_password.as_deref().unwrap_or_default(),
            body.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    log_in(&session, &user).await?;
    Ok(ok(user))
}

/// Email a password reset link.
///
/// # Errors
///
/// Returns 400 for an unknown email and 500 if the email cannot be sent.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<Response, AppError> {
    state
        .auth()
        .forgot_password(body.email.as_deref().unwrap_or_default())
        .await?;
    Ok(ok("Email sent"))
}

/// Set a new password with a reset token and log in.
///
/// # Errors
///
/// Returns 401 for an unknown, used, or expired token.
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    let user = state
        .auth()
        .reset_password(&token, body.password.as_deref().unwrap_or_default())
        .await?;
    log_in(&session, &user).await?;
    Ok(ok(user))
}
