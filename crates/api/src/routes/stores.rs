//! Store handlers.

use axum::{Router, extract::State, response::Response, routing::get};

use bookaholic_core::StoreId;

use super::{ApiJson, ApiPath, ApiQuery, PageQuery, created, deleted, listed, ok, paged};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{StoreInput, StorePatch};
use crate::services::stores::parse_distance;
use crate::state::AppState;

/// Build the stores router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/{id}", get(get_store).put(update_store).delete(delete_store))
        .route("/radius/{zipcode}/{distance}", get(stores_in_radius))
        // Shares its first segment with `/{id}`; here that segment is the zipcode.
        .route("/{id}/{distance}", get(stores_in_radius))
}

/// # Errors
///
/// Returns 500 if storage fails.
pub async fn list_stores(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    Ok(paged(state.stores().list(query.into()).await?))
}

/// A store with its books.
///
/// # Errors
///
/// Returns 404 if the store does not exist.
pub async fn get_store(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StoreId>,
) -> Result<Response, AppError> {
    Ok(ok(state.stores().get(id).await?))
}

/// # Errors
///
/// Returns 403 for roles that may not own stores and 400 for bad input or an
/// address the geocoder cannot find.
pub async fn create_store(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<StoreInput>,
) -> Result<Response, AppError> {
    Ok(created(state.stores().create(&user, body).await?))
}

/// # Errors
///
/// Returns 404 if the store does not exist, 401/403 if the user may not
/// modify it.
pub async fn update_store(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<StoreId>,
    ApiJson(body): ApiJson<StorePatch>,
) -> Result<Response, AppError> {
    Ok(ok(state.stores().update(&user, id, body).await?))
}

/// # Errors
///
/// Returns 404 if the store does not exist, 401/403 if the user may not
/// delete it.
pub async fn delete_store(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<StoreId>,
) -> Result<Response, AppError> {
    state.stores().delete(&user, id).await?;
    Ok(deleted())
}

/// Stores within `distance` miles of `zipcode`.
///
/// # Errors
///
/// Returns 400 for a bad distance or an unknown postal code.
pub async fn stores_in_radius(
    State(state): State<AppState>,
    ApiPath((zipcode, distance)): ApiPath<(String, String)>,
) -> Result<Response, AppError> {
    let miles = parse_distance(&distance)?;
    Ok(listed(state.stores().within_radius(&zipcode, miles).await?))
}
