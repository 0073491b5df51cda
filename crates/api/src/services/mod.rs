//! Business logic services.
//!
//! Handlers stay thin: they extract the request, call one service method,
//! and wrap the result in the response envelope. Services own validation,
//! authorization through the [`guard`], and the follow-up work that must
//! happen after a write (rating aggregation after review changes).

pub mod auth;
pub mod books;
pub mod email;
pub mod geocoder;
pub mod guard;
pub mod rating;
pub mod reviews;
pub mod stores;
pub mod uploads;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use auth::AuthService;
pub use books::BookService;
pub use reviews::ReviewService;
pub use stores::StoreService;
pub use users::UserAdminService;
