//! Review handlers. Reviews are created under `/books/{id}/reviews`.

use axum::{Router, extract::State, response::Response, routing::get};

use bookaholic_core::ReviewId;

use super::{ApiJson, ApiPath, ApiQuery, PageQuery, deleted, ok, paged};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::ReviewPatch;
use crate::state::AppState;

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews))
        .route("/{id}", get(get_review).put(update_review).delete(delete_review))
}

/// # Errors
///
/// Returns 500 if storage fails.
pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    Ok(paged(state.reviews().list(query.into()).await?))
}

/// # Errors
///
/// Returns 404 if the review does not exist.
pub async fn get_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ReviewId>,
) -> Result<Response, AppError> {
    Ok(ok(state.reviews().get(id).await?))
}

/// Update a review and re-aggregate its book's rating.
///
/// # Errors
///
/// Returns 404 if the review does not exist, 401/403 if the user may not
/// modify it.
pub async fn update_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
    ApiJson(body): ApiJson<ReviewPatch>,
) -> Result<Response, AppError> {
    Ok(ok(state.reviews().update(&user, id, body).await?))
}

/// Delete a review and re-aggregate its book's rating.
///
/// # Errors
///
/// Returns 404 if the review does not exist, 401/403 if the user may not
/// delete it.
pub async fn delete_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
) -> Result<Response, AppError> {
    state.reviews().delete(&user, id).await?;
    Ok(deleted())
}
