//! Admin user management handlers. Every route requires an admin.

use axum::{Router, extract::State, response::Response, routing::get};

use bookaholic_core::UserId;

use super::{ApiJson, ApiPath, ApiQuery, PageQuery, created, deleted, ok, paged};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{UserInput, UserPatch};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

/// # Errors
///
/// Returns 403 for non-admins.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    Ok(paged(state.users().list(query.into()).await?))
}

/// # Errors
///
/// Returns 404 if the user does not exist.
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Response, AppError> {
    Ok(ok(state.users().get(id).await?))
}

/// Create a user of any role.
///
/// # Errors
///
/// Returns 400 for invalid input or a taken email.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<UserInput>,
) -> Result<Response, AppError> {
    let user = state.users().create(body).await?;
    tracing::info!(admin = %admin.id, user = %user.id, "admin created user");
    Ok(created(user))
}

/// # Errors
///
/// Returns 404 if the user does not exist.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UserPatch>,
) -> Result<Response, AppError> {
    Ok(ok(state.users().update(id, body).await?))
}

/// # Errors
///
/// Returns 404 if the user does not exist and 400 if they still own data.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Response, AppError> {
    state.users().delete(id).await?;
    Ok(deleted())
}
