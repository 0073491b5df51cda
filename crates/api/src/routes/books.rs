//! Book handlers, including nested reviews and nearby-store search.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    response::Response,
    routing::{get, put},
};

use bookaholic_core::{BookId, StoreId};

use super::{ApiJson, ApiPath, ApiQuery, PageQuery, created, deleted, listed, ok, paged};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{BookInput, BookPatch, ReviewInput};
use crate::services::stores::parse_distance;
use crate::services::uploads::{CoverUpload, UploadError};
use crate::state::AppState;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Name of the multipart field carrying the cover image.
pub const COVER_FIELD: &str = "file";

/// Build the books router. Cover uploads may carry up to
/// `max_upload_bytes` of file data.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_books))
        // `{id}` is the store id for POST and the book id otherwise.
        .route(
            "/{id}",
            get(get_book)
                .post(create_book)
                .put(update_book)
                .delete(delete_book),
        )
        .route(
            "/{id}/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/{id}/reviews", get(book_reviews).post(create_review))
        .route("/{id}/stores/{zipcode}/{distance}", get(stores_near_book))
}

/// # Errors
///
/// Returns 500 if storage fails.
pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    Ok(paged(state.books().list(query.into()).await?))
}

/// # Errors
///
/// Returns 404 if the book does not exist.
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Response, AppError> {
    Ok(ok(state.books().get(id).await?))
}

/// Create a book in the store named by the path.
///
/// # Errors
///
/// Returns 403 for roles that may not list books, 404 if the store does not
/// exist, and 400 for bad input or a taken name.
pub async fn create_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(store): ApiPath<StoreId>,
    ApiJson(body): ApiJson<BookInput>,
) -> Result<Response, AppError> {
    Ok(created(state.books().create(&user, store, body).await?))
}

/// # Errors
///
/// Returns 404 if the book does not exist, 401/403 if the user may not
/// modify it.
pub async fn update_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(body): ApiJson<BookPatch>,
) -> Result<Response, AppError> {
    Ok(ok(state.books().update(&user, id, body).await?))
}

/// # Errors
///
/// Returns 404 if the book does not exist, 401/403 if the user may not
/// delete it.
pub async fn delete_book(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Response, AppError> {
    state.books().delete(&user, id).await?;
    Ok(deleted())
}

/// Upload a cover image from the multipart field `file`.
///
/// Responds with the stored file name.
///
/// # Errors
///
/// Returns 400 if the file is missing, not an image, or too large.
pub async fn upload_photo(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BookId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart = multipart.map_err(|e| UploadError::Malformed(e.body_text()))?;
    let upload = read_cover(multipart).await?;
    let file_name = state.books().upload_cover(&user, id, upload).await?;
    Ok(ok(file_name))
}

async fn read_cover(mut multipart: Multipart) -> Result<Option<CoverUpload>, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.body_text()))?
    {
        if field.name() != Some(COVER_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Malformed(e.body_text()))?;
        return Ok(Some(CoverUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Reviews of a book.
///
/// # Errors
///
/// Returns 404 if the book does not exist.
pub async fn book_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Response, AppError> {
    Ok(listed(state.reviews().for_book(id).await?))
}

/// Review a book.
///
/// # Errors
///
/// Returns 403 for roles that may not review, 404 if the book does not
/// exist, and 400 for bad input.
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(body): ApiJson<ReviewInput>,
) -> Result<Response, AppError> {
    Ok(created(state.reviews().create(&user, id, body).await?))
}

/// Stores within `distance` miles of `zipcode`, for an existing book.
///
/// # Errors
///
/// Returns 404 if the book does not exist and 400 for a bad distance or an
/// unknown postal code.
pub async fn stores_near_book(
    State(state): State<AppState>,
    ApiPath((id, zipcode, distance)): ApiPath<(BookId, String, String)>,
) -> Result<Response, AppError> {
    state.books().get(id).await?;
    let miles = parse_distance(&distance)?;
    Ok(listed(state.stores().within_radius(&zipcode, miles).await?))
}
