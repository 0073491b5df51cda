//! In-memory storage backend.
//!
//! Used when no database URL is configured, and by tests. Semantics match
//! [`PgDatabase`](super::PgDatabase): unique emails and book names, cascading
//! store and book deletes, restricted user deletes, newest-first listings.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bookaholic_core::{BookId, Email, GeoPoint, Rating, ReviewId, StoreId, UserId};

use super::{
    BookRepository, Database, PageRequest, Paged, RepositoryError, ReviewRepository,
    StoreRepository, UserRepository,
};
use crate::models::{
    Book, BookChanges, DEFAULT_COVER, NewBook, NewReview, NewStore, NewUser, ResetToken, Review,
    ReviewChanges, Store, StoreChanges, User, UserChanges,
};

/// Conflict message for a taken email address.
pub(crate) const DUPLICATE_EMAIL: &str = "Email is already registered";
/// Conflict message for a taken book name.
pub(crate) const DUPLICATE_BOOK_NAME: &str = "A book with that name already exists";
/// Conflict message for deleting a user that still owns resources.
pub(crate) const USER_OWNS_RESOURCES: &str = "User still owns stores, books, or reviews";

struct UserRecord {
    user: User,
    password_hash: String,
    reset_token: Option<ResetToken>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    stores: BTreeMap<StoreId, Store>,
    books: BTreeMap<BookId, Book>,
    reviews: BTreeMap<ReviewId, Review>,
    last_id: i32,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| &r.user.email == email && Some(r.user.id) != except)
    }

    fn book_name_taken(&self, name: &str, except: Option<BookId>) -> bool {
        self.books
            .values()
            .any(|b| b.name == name && Some(b.id) != except)
    }

    fn remove_book_cascade(&mut self, id: BookId) {
        self.books.remove(&id);
        self.reviews.retain(|_, r| r.book != id);
    }
}

/// Storage kept entirely in process memory.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest-first page over records stored in ascending id order.
fn paginate<'a, T: Clone + 'a>(
    records: impl DoubleEndedIterator<Item = &'a T> + ExactSizeIterator,
    page: PageRequest,
) -> Paged<T> {
    let total = records.len() as u64;
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = records
        .rev()
        .skip(skip)
        .take(page.limit as usize)
        .cloned()
        .collect();
    Paged { items, total, page }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict(DUPLICATE_EMAIL.to_owned()));
        }

        let id = UserId::new(tables.next_id());
        let created = User {
            id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(
            id,
            UserRecord {
                user: created.clone(),
                password_hash: user.password_hash,
                reset_token: None,
            },
        );
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|r| r.password_hash.clone()))
    }

    async fn list_users(&self, page: PageRequest) -> Result<Paged<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.users.values().map(|r| &r.user), page))
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email
            && tables.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict(DUPLICATE_EMAIL.to_owned()));
        }

        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = changes.name {
            record.user.name = name;
        }
        if let Some(email) = changes.email {
            record.user.email = email;
        }
        if let Some(role) = changes.role {
            record.user.role = role;
        }
        Ok(record.user.clone())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut record.password_hash);
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }

        let owns_anything = tables.stores.values().any(|s| s.owner == id)
            || tables.books.values().any(|b| b.owner == id)
            || tables.reviews.values().any(|r| r.owner == id);
        if owns_anything {
            return Err(RepositoryError::Conflict(USER_OWNS_RESOURCES.to_owned()));
        }

        tables.users.remove(&id);
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: Option<ResetToken>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.reset_token = token;
        Ok(())
    }

    async fn find_reset_token_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|r| {
                r.reset_token
                    .as_ref()
                    .is_some_and(|t| t.hash == token_hash && t.expires_at > now)
            })
            .map(|r| r.user.id))
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let record = tables.users.values_mut().find(|r| {
            r.reset_token
                .as_ref()
                .is_some_and(|t| t.hash == token_hash && t.expires_at > now)
        });

        Ok(record.map(|r| {
            r.reset_token = None;
            password_hash.clone_into(&mut r.password_hash);
            r.user.clone()
        }))
    }
}

#[async_trait]
impl StoreRepository for MemoryDatabase {
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = StoreId::new(tables.next_id());
        let created = Store {
            id,
            name: store.name,
            address: store.address,
            location: store.location,
            owner: store.owner,
            created_at: Utc::now(),
        };
        tables.stores.insert(id, created.clone());
        Ok(created)
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.stores.get(&id).cloned())
    }

    async fn list_stores(&self, page: PageRequest) -> Result<Paged<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.stores.values(), page))
    }

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.write().await;
        let store = tables.stores.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = changes.name {
            store.name = name;
        }
        if let Some((address, location)) = changes.address {
            store.address = address;
            store.location = location;
        }
        Ok(store.clone())
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.stores.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        let books: Vec<BookId> = tables
            .books
            .values()
            .filter(|b| b.store == id)
            .map(|b| b.id)
            .collect();
        for book in books {
            tables.remove_book_cascade(book);
        }
        Ok(())
    }

    async fn stores_within_radius(
        &self,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .values()
            .filter(|s| center.within(&s.location.point, radius))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookRepository for MemoryDatabase {
    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.stores.contains_key(&book.store) {
            return Err(RepositoryError::NotFound);
        }
        if tables.book_name_taken(&book.name, None) {
            return Err(RepositoryError::Conflict(DUPLICATE_BOOK_NAME.to_owned()));
        }

        let id = BookId::new(tables.next_id());
        let created = Book {
            id,
            name: book.name,
            description: book.description,
            price: book.price,
            author_name: book.author_name,
            average_rating: None,
            book_cover: DEFAULT_COVER.to_owned(),
            owner: book.owner,
            store: book.store,
            created_at: Utc::now(),
        };
        tables.books.insert(id, created.clone());
        Ok(created)
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.books.get(&id).cloned())
    }

    async fn list_books(&self, page: PageRequest) -> Result<Paged<Book>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.books.values(), page))
    }

    async fn books_for_store(&self, store: StoreId) -> Result<Vec<Book>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .books
            .values()
            .rev()
            .filter(|b| b.store == store)
            .cloned()
            .collect())
    }

    async fn update_book(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> Result<Book, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name
            && tables.book_name_taken(name, Some(id))
        {
            return Err(RepositoryError::Conflict(DUPLICATE_BOOK_NAME.to_owned()));
        }

        let book = tables.books.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = changes.name {
            book.name = name;
        }
        if let Some(description) = changes.description {
            book.description = description;
        }
        if let Some(price) = changes.price {
            book.price = price;
        }
        if let Some(author_name) = changes.author_name {
            book.author_name = author_name;
        }
        Ok(book.clone())
    }

    async fn set_book_cover(&self, id: BookId, file_name: &str) -> Result<Book, RepositoryError> {
        let mut tables = self.tables.write().await;
        let book = tables.books.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        file_name.clone_into(&mut book.book_cover);
        Ok(book.clone())
    }

    async fn set_average_rating(
        &self,
        id: BookId,
        average: Option<f64>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let book = tables.books.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        book.average_rating = average;
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.remove_book_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for MemoryDatabase {
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&review.book) {
            return Err(RepositoryError::NotFound);
        }

        let id = ReviewId::new(tables.next_id());
        let created = Review {
            id,
            title: review.title,
            text: review.text,
            rating: review.rating,
            book: review.book,
            owner: review.owner,
            created_at: Utc::now(),
        };
        tables.reviews.insert(id, created.clone());
        Ok(created)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.get(&id).cloned())
    }

    async fn list_reviews(&self, page: PageRequest) -> Result<Paged<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.reviews.values(), page))
    }

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .rev()
            .filter(|r| r.book == book)
            .cloned()
            .collect())
    }

    async fn ratings_for_book(&self, book: BookId) -> Result<Vec<Rating>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.book == book)
            .map(|r| r.rating)
            .collect())
    }

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        let mut tables = self.tables.write().await;
        let review = tables.reviews.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(title) = changes.title {
            review.title = title;
        }
        if let Some(text) = changes.text {
            review.text = text;
        }
        if let Some(rating) = changes.rating {
            review.rating = rating;
        }
        Ok(review.clone())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
        Ok(())
    }
}
