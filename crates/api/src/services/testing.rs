//! In-process collaborators for tests.
//!
//! Each fake records what it was asked to do so tests can assert on side
//! effects without network or disk access.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use bookaholic_core::{BookId, Email, GeoPoint, Location, Rating, ReviewId, StoreId, UserId};

use crate::db::{
    BookRepository, Database, MemoryDatabase, PageRequest, Paged, RepositoryError,
    ReviewRepository, StoreRepository, UserRepository,
};
use crate::models::{
    Book, BookChanges, NewBook, NewReview, NewStore, NewUser, ResetToken, Review, ReviewChanges,
    Store, StoreChanges, User, UserChanges,
};

use super::email::{EmailError, Mailer, OutgoingEmail};
use super::geocoder::{GeocodeError, Geocoder};
use super::uploads::{FileStore, UploadError};

/// Mailer that keeps every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    /// Messages delivered so far, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// Mailer whose every delivery fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress("unreachable".to_owned()))
    }
}

/// Geocoder answering from a fixed table. Unknown queries have no match.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    known: HashMap<String, GeoPoint>,
    queries: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `query` to `point`.
    #[must_use]
    pub fn with(mut self, query: &str, point: GeoPoint) -> Self {
        self.known.insert(query.to_owned(), point);
        self
    }

    /// Every query received, in order.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

/// A location whose formatted address is the query itself.
#[must_use]
pub fn location_for(query: &str, point: GeoPoint) -> Location {
    Location {
        point,
        formatted_address: query.to_owned(),
        street: None,
        city: None,
        state: None,
        zipcode: None,
        country: None,
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError> {
        self.queries.lock().await.push(query.to_owned());
        self.known
            .get(query)
            .map(|point| location_for(query, *point))
            .ok_or_else(|| GeocodeError::NoMatch(query.to_owned()))
    }
}

/// File store keeping uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    /// Names of the stored files.
    pub async fn names(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }

    /// Contents of a stored file.
    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), UploadError> {
        self.files
            .lock()
            .await
            .insert(file_name.to_owned(), bytes.to_vec());
        Ok(())
    }
}

/// In-memory database that also records every radius search it serves.
#[derive(Default)]
pub struct RecordingDatabase {
    inner: MemoryDatabase,
    radius_searches: Mutex<Vec<(GeoPoint, f64)>>,
}

impl RecordingDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Center and radius (radians) of each radius search, oldest first.
    pub async fn radius_searches(&self) -> Vec<(GeoPoint, f64)> {
        self.radius_searches.lock().await.clone()
    }
}

#[async_trait]
impl UserRepository for RecordingDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        self.inner.get_password_hash(id).await
    }

    async fn list_users(&self, page: PageRequest) -> Result<Paged<User>, RepositoryError> {
        self.inner.list_users(page).await
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        self.inner.update_user(id, changes).await
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.inner.update_password(id, password_hash).await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        self.inner.delete_user(id).await
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: Option<ResetToken>,
    ) -> Result<(), RepositoryError> {
        self.inner.set_reset_token(id, token).await
    }

    async fn find_reset_token_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        self.inner.find_reset_token_user(token_hash, now).await
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.inner
            .consume_reset_token(token_hash, now, password_hash)
            .await
    }
}

#[async_trait]
impl StoreRepository for RecordingDatabase {
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        self.inner.create_store(store).await
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        self.inner.get_store(id).await
    }

    async fn list_stores(&self, page: PageRequest) -> Result<Paged<Store>, RepositoryError> {
        self.inner.list_stores(page).await
    }

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        self.inner.update_store(id, changes).await
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        self.inner.delete_store(id).await
    }

    async fn stores_within_radius(
        &self,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Store>, RepositoryError> {
        self.radius_searches.lock().await.push((center, radius));
        self.inner.stores_within_radius(center, radius).await
    }
}

#[async_trait]
impl BookRepository for RecordingDatabase {
    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError> {
        self.inner.create_book(book).await
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        self.inner.get_book(id).await
    }

    async fn list_books(&self, page: PageRequest) -> Result<Paged<Book>, RepositoryError> {
        self.inner.list_books(page).await
    }

    async fn books_for_store(&self, store: StoreId) -> Result<Vec<Book>, RepositoryError> {
        self.inner.books_for_store(store).await
    }

    async fn update_book(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> Result<Book, RepositoryError> {
        self.inner.update_book(id, changes).await
    }

    async fn set_book_cover(&self, id: BookId, file_name: &str) -> Result<Book, RepositoryError> {
        self.inner.set_book_cover(id, file_name).await
    }

    async fn set_average_rating(
        &self,
        id: BookId,
        average: Option<f64>,
    ) -> Result<(), RepositoryError> {
        self.inner.set_average_rating(id, average).await
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError> {
        self.inner.delete_book(id).await
    }
}

#[async_trait]
impl ReviewRepository for RecordingDatabase {
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        self.inner.create_review(review).await
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        self.inner.get_review(id).await
    }

    async fn list_reviews(&self, page: PageRequest) -> Result<Paged<Review>, RepositoryError> {
        self.inner.list_reviews(page).await
    }

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_for_book(book).await
    }

    async fn ratings_for_book(&self, book: BookId) -> Result<Vec<Rating>, RepositoryError> {
        self.inner.ratings_for_book(book).await
    }

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        self.inner.update_review(id, changes).await
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        self.inner.delete_review(id).await
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.inner.clear().await
    }
}
