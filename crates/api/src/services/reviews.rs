//! Reviews and the rating aggregation they trigger.
//!
//! Every successful create, update, and delete is followed by
//! [`recompute_average_rating`] for the affected book before returning.

use bookaholic_core::{BookId, ReviewId};

use crate::db::{Database, PageRequest, Paged, RepositoryError};
use crate::error::AppError;
use crate::models::{Review, ReviewInput, ReviewPatch, User};
use crate::services::books::book_not_found;
use crate::services::guard::{Action, Resource, authorize_create, authorize_mutation};
use crate::services::rating::recompute_average_rating;

fn review_not_found(id: ReviewId) -> AppError {
    AppError::NotFound(format!("Review not found with id of {id}"))
}

/// Reviews service.
pub struct ReviewService<'a> {
    db: &'a dyn Database,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// One page of reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn list(&self, page: PageRequest) -> Result<Paged<Review>, AppError> {
        Ok(self.db.list_reviews(page).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the review does not exist.
    pub async fn get(&self, id: ReviewId) -> Result<Review, AppError> {
        self.db
            .get_review(id)
            .await?
            .ok_or_else(|| review_not_found(id))
    }

    /// All reviews of a book.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book does not exist.
    pub async fn for_book(&self, book: BookId) -> Result<Vec<Review>, AppError> {
        if self.db.get_book(book).await?.is_none() {
            return Err(book_not_found(book));
        }
        Ok(self.db.reviews_for_book(book).await?)
    }

    /// Review `book` as `user`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Denied` if the user's role may not review,
    /// `AppError::NotFound` if the book does not exist, and
    /// `AppError::Validation` for bad input.
    pub async fn create(&self, user: &User, book: BookId, input: ReviewInput) -> Result<Review, AppError> {
        authorize_create(user, Resource::Review)?;
        if self.db.get_book(book).await?.is_none() {
            return Err(book_not_found(book));
        }

        let new_review = input.into_new_review(user.id, book)?;
        let review = self
            .db
            .create_review(new_review)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => book_not_found(book),
                other => other.into(),
            })?;

        tracing::info!(review = %review.id, book = %book, owner = %user.id, "review created");
        recompute_average_rating(self.db, book).await;
        Ok(review)
    }

    /// Update a review's title, text, or rating.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the review does not exist and
    /// `AppError::Denied` if the user may not modify it.
    pub async fn update(&self, user: &User, id: ReviewId, patch: ReviewPatch) -> Result<Review, AppError> {
        let existing = self.get(id).await?;
        authorize_mutation(user, existing.owner, Resource::Review, Action::Update)?;

        let changes = patch.into_changes()?;
        let review = self.db.update_review(id, changes).await?;

        recompute_average_rating(self.db, review.book).await;
        Ok(review)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the review does not exist and
    /// `AppError::Denied` if the user may not delete it.
    pub async fn delete(&self, user: &User, id: ReviewId) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        authorize_mutation(user, existing.owner, Resource::Review, Action::Delete)?;

        self.db.delete_review(id).await?;
        tracing::info!(review = %id, user = %user.id, "review deleted");

        recompute_average_rating(self.db, existing.book).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use bookaholic_core::{Email, GeoPoint, Location, Price, Role};

    use super::*;
    use crate::db::{BookRepository, MemoryDatabase, StoreRepository, UserRepository};
    use crate::models::{NewBook, NewStore, NewUser};
    use crate::services::guard::AccessDenied;

    async fn user(db: &MemoryDatabase, email: &str, role: Role) -> User {
        db.create_user(NewUser {
            name: email.to_owned(),
            email: Email::parse(email).unwrap(),
            role,
            password_hash: "hash".to_owned(),
        })
        .await
        .unwrap()
    }

    async fn dune(db: &MemoryDatabase) -> BookId {
        let owner = user(db, "owner@example.com", Role::StoreOwner).await;
        let store = db
            .create_store(NewStore {
                name: "Loop Books".to_owned(),
                address: "1 Loop St".to_owned(),
                location: Location {
                    point: GeoPoint::new(-87.6, 41.9),
                    formatted_address: "1 Loop St".to_owned(),
                    street: None,
                    city: None,
                    state: None,
                    zipcode: None,
                    country: None,
                },
                owner: owner.id,
            })
            .await
            .unwrap();
        db.create_book(NewBook {
            name: "Dune".to_owned(),
            description: "Spice.".to_owned(),
            price: Price::new(Decimal::new(999, 2)).unwrap(),
            author_name: "Frank Herbert".to_owned(),
            owner: owner.id,
            store: store.id,
        })
        .await
        .unwrap()
        .id
    }

    fn review(rating: i64) -> ReviewInput {
        ReviewInput {
            title: Some(format!("{rating} stars")),
            text: Some("Read it twice.".to_owned()),
            rating: Some(rating),
        }
    }

    async fn average(db: &MemoryDatabase, book: BookId) -> Option<f64> {
        db.get_book(book).await.unwrap().unwrap().average_rating
    }

    #[tokio::test]
    async fn test_dune_scenario() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let book = dune(&db).await;
        let alice = user(&db, "alice@example.com", Role::User).await;
        let bob = user(&db, "bob@example.com", Role::User).await;

        assert_eq!(average(&db, book).await, None);

        let eight = reviews.create(&alice, book, review(8)).await.unwrap();
        assert_eq!(average(&db, book).await, Some(8.0));

        let four = reviews.create(&bob, book, review(4)).await.unwrap();
        assert_eq!(average(&db, book).await, Some(6.0));

        reviews.delete(&alice, eight.id).await.unwrap();
        assert_eq!(average(&db, book).await, Some(4.0));

        reviews.delete(&bob, four.id).await.unwrap();
        assert_eq!(average(&db, book).await, None);
    }

    #[tokio::test]
    async fn test_update_reaggregates() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let book = dune(&db).await;
        let alice = user(&db, "alice@example.com", Role::User).await;
        let bob = user(&db, "bob@example.com", Role::User).await;

        let first = reviews.create(&alice, book, review(3)).await.unwrap();
        reviews.create(&bob, book, review(6)).await.unwrap();
        assert_eq!(average(&db, book).await, Some(4.5));

        let patch = ReviewPatch {
            rating: Some(10),
            ..ReviewPatch::default()
        };
        let updated = reviews.update(&alice, first.id, patch).await.unwrap();
        assert_eq!(updated.rating.value(), 10);
        assert_eq!(updated.title, "3 stars");
        assert_eq!(average(&db, book).await, Some(8.0));
    }

    #[tokio::test]
    async fn test_storeowner_cannot_review() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let book = dune(&db).await;
        let seller = user(&db, "seller@example.com", Role::StoreOwner).await;

        assert!(matches!(
            reviews.create(&seller, book, review(9)).await,
            Err(AppError::Denied(AccessDenied::RoleNotPermitted { .. }))
        ));
        assert_eq!(average(&db, book).await, None);
    }

    #[tokio::test]
    async fn test_missing_book() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let reader = user(&db, "reader@example.com", Role::User).await;

        assert!(matches!(
            reviews.create(&reader, BookId::new(77), review(5)).await,
            Err(AppError::NotFound(message)) if message == "Book not found with id of 77"
        ));
        assert!(matches!(
            reviews.for_book(BookId::new(77)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_not_stored() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let book = dune(&db).await;
        let reader = user(&db, "reader@example.com", Role::User).await;

        assert!(matches!(
            reviews.create(&reader, book, review(11)).await,
            Err(AppError::Validation(_))
        ));
        assert!(reviews.for_book(book).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_reader_is_not_owner_admin_is() {
        let db = MemoryDatabase::new();
        let reviews = ReviewService::new(&db);
        let book = dune(&db).await;
        let alice = user(&db, "alice@example.com", Role::User).await;
        let bob = user(&db, "bob@example.com", Role::User).await;
        let admin = user(&db, "admin@example.com", Role::Admin).await;

        let mine = reviews.create(&alice, book, review(7)).await.unwrap();
        assert!(matches!(
            reviews.delete(&bob, mine.id).await,
            Err(AppError::Denied(AccessDenied::NotOwner { .. }))
        ));
        assert_eq!(average(&db, book).await, Some(7.0));

        reviews.delete(&admin, mine.id).await.unwrap();
        assert_eq!(average(&db, book).await, None);
    }
}
