//! Storage layer.
//!
//! Storage is reached through the [`Database`] trait so the service can run
//! against `PostgreSQL` or, without a configured database, fully in memory.
//!
//! # Tables
//!
//! - `users` - Accounts, password hashes, and reset-token state
//! - `stores` - Stores with their geocoded location
//! - `books` - Books, each listed in one store
//! - `reviews` - Reviews, each attached to one book
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! Deleting a store removes its books, and deleting a book removes its
//! reviews. A user that still owns stores, books, or reviews cannot be
//! deleted.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bookaholic-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bookaholic_core::{BookId, Email, GeoPoint, Rating, ReviewId, StoreId, UserId};

use crate::models::{
    Book, BookChanges, NewBook, NewReview, NewStore, NewUser, ResetToken, Review, ReviewChanges,
    Store, StoreChanges, User, UserChanges,
};

pub use memory::MemoryDatabase;
pub use postgres::{PgDatabase, create_pool};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate book name).
    #[error("{0}")]
    Conflict(String),
}

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;
/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page of a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Build a page request, applying defaults and clamping out-of-range values.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number of matching records.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: PageRequest,
}

impl<T> Paged<T> {
    /// Whether a page exists after this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page.offset() + (self.items.len() as u64) < self.total
    }

    /// Whether a page exists before this one.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page.page > 1
    }
}

/// User accounts, credentials, and reset tokens.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Returns `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The stored Argon2 hash for a user, if the user exists.
    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    async fn list_users(&self, page: PageRequest) -> Result<Paged<User>, RepositoryError>;

    /// Apply changes. Returns `NotFound` or, for a taken email, `Conflict`.
    async fn update_user(&self, id: UserId, changes: UserChanges)
    -> Result<User, RepositoryError>;

    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Delete a user. Returns `Conflict` while the user still owns resources.
    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError>;

    /// Store or clear (`None`) the user's reset token.
    async fn set_reset_token(
        &self,
        id: UserId,
        token: Option<ResetToken>,
    ) -> Result<(), RepositoryError>;

    /// The user holding an unexpired token with this hash, without consuming it.
    async fn find_reset_token_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError>;

    /// Atomically match an unexpired token hash, set the new password hash,
    /// and clear the token. Returns the user on success, `None` otherwise.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Stores and their locations.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError>;

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    async fn list_stores(&self, page: PageRequest) -> Result<Paged<Store>, RepositoryError>;

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError>;

    /// Delete a store together with its books and their reviews.
    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError>;

    /// Stores whose location lies within `radius` radians of `center`.
    async fn stores_within_radius(
        &self,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Store>, RepositoryError>;
}

/// Books and their derived fields.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a book. Returns `Conflict` for a duplicate name and
    /// `NotFound` if the store does not exist.
    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError>;

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError>;

    async fn list_books(&self, page: PageRequest) -> Result<Paged<Book>, RepositoryError>;

    async fn books_for_store(&self, store: StoreId) -> Result<Vec<Book>, RepositoryError>;

    async fn update_book(&self, id: BookId, changes: BookChanges)
    -> Result<Book, RepositoryError>;

    async fn set_book_cover(&self, id: BookId, file_name: &str) -> Result<Book, RepositoryError>;

    /// Overwrite the derived rating. Returns `NotFound` if the book is gone.
    async fn set_average_rating(
        &self,
        id: BookId,
        average: Option<f64>,
    ) -> Result<(), RepositoryError>;

    /// Delete a book together with its reviews.
    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError>;
}

/// Reviews and the ratings they carry.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review. Returns `NotFound` if the book does not exist.
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError>;

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;

    async fn list_reviews(&self, page: PageRequest) -> Result<Paged<Review>, RepositoryError>;

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, RepositoryError>;

    /// Ratings of every review currently attached to `book`.
    async fn ratings_for_book(&self, book: BookId) -> Result<Vec<Rating>, RepositoryError>;

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError>;

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Database: UserRepository + StoreRepository + BookRepository + ReviewRepository {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Delete every record. Used by the seeder.
    async fn clear(&self) -> Result<(), RepositoryError>;
}
