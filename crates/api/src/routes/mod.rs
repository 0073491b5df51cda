//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Storage ping
//!
//! # Auth (/api/v1/auth)
//! POST /register                                - Register and log in
//! POST /login                                   - Log in
//! GET  /logout                                  - Log out
//! GET  /me                                      - Current user
//! PUT  /updatedetails                           - Change name/email
//! PUT  /updatepassword                          - Change password
//! POST /forgotpassword                          - Email a reset token
//! PUT  /resetpassword/{token}                   - Consume a reset token
//!
//! # Users (/api/v1/auth/users, admin only)
//! GET|POST         /
//! GET|PUT|DELETE   /{id}
//!
//! # Stores (/api/v1/stores)
//! GET|POST         /
//! GET|PUT|DELETE   /{id}
//! GET              /radius/{zipcode}/{distance}
//!
//! # Books (/api/v1/books)
//! GET              /
//! POST             /{storeId}                   - Create a book in a store
//! GET|PUT|DELETE   /{id}
//! PUT              /{id}/photo                  - Multipart field `file`
//! GET|POST         /{id}/reviews
//! GET              /{id}/stores/{zipcode}/{distance}
//!
//! # Reviews (/api/v1/reviews)
//! GET              /
//! GET|PUT|DELETE   /{id}
//! ```

pub mod auth;
pub mod books;
pub mod reviews;
pub mod stores;
pub mod users;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::db::{PageRequest, Paged};
use crate::error::AppError;
use crate::state::AppState;

/// Build the versioned API router.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .nest("/auth", auth::router().nest("/users", users::router()))
            .nest("/stores", stores::router())
            .nest("/books", books::router(max_upload_bytes))
            .nest("/reviews", reviews::router()),
    )
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body extractor whose rejection uses the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `?page=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        Self::new(query.page, query.limit)
    }
}

// =============================================================================
// Response Envelopes
// =============================================================================

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap `data` in a success envelope with status 200.
pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope {
        success: true,
        data,
    })
    .into_response()
}

/// Wrap `data` in a success envelope with status 201.
pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            data,
        }),
    )
        .into_response()
}

/// Success envelope with empty data, returned by deletes.
pub fn deleted() -> Response {
    ok(serde_json::json!({}))
}

/// Success envelope for a plain list, with its length.
pub fn listed<T: Serialize>(items: Vec<T>) -> Response {
    Json(ListEnvelope {
        success: true,
        count: items.len(),
        pagination: None,
        data: items,
    })
    .into_response()
}

/// Success envelope for one page of a listing.
pub fn paged<T: Serialize>(page: Paged<T>) -> Response {
    let pagination = Pagination {
        next: page.has_next().then(|| PageLink {
            page: page.page.page + 1,
            limit: page.page.limit,
        }),
        prev: page.has_prev().then(|| PageLink {
            page: page.page.page - 1,
            limit: page.page.limit,
        }),
    };
    Json(ListEnvelope {
        success: true,
        count: page.items.len(),
        pagination: Some(pagination),
        data: page.items,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
struct ListEnvelope<T> {
    success: bool,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    data: Vec<T>,
}

#[derive(Debug, Serialize)]
struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev: Option<PageLink>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct PageLink {
    page: u32,
    limit: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    use super::*;

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_paged_envelope() {
        let page = Paged {
            items: vec![1, 2],
            total: 5,
            page: PageRequest::new(Some(2), Some(2)),
        };
        assert_eq!(
            body(paged(page)).await,
            json!({
                "success": true,
                "count": 2,
                "pagination": {
                    "next": {"page": 3, "limit": 2},
                    "prev": {"page": 1, "limit": 2}
                },
                "data": [1, 2]
            })
        );
    }

    #[tokio::test]
    async fn test_single_page_has_no_links() {
        let page = Paged {
            items: vec!["a"],
            total: 1,
            page: PageRequest::default(),
        };
        let value = body(paged(page)).await;
        assert_eq!(value["pagination"], json!({}));
    }

    #[tokio::test]
    async fn test_created_and_deleted() {
        let response = created(json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body(response).await,
            json!({"success": true, "data": {"id": 1}})
        );
        assert_eq!(body(deleted()).await, json!({"success": true, "data": {}}));
    }
}
