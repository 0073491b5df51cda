//! Book management and cover uploads.

use bookaholic_core::{BookId, StoreId};

use crate::db::{Database, PageRequest, Paged, RepositoryError};
use crate::error::AppError;
use crate::models::{Book, BookInput, BookPatch, User};
use crate::services::guard::{Action, Resource, authorize_create, authorize_mutation};
use crate::services::stores::store_not_found;
use crate::services::uploads::{CoverUpload, FileStore, UploadError};

pub(crate) fn book_not_found(id: BookId) -> AppError {
    AppError::NotFound(format!("Book not found with id of {id}"))
}

/// Books service.
pub struct BookService<'a> {
    db: &'a dyn Database,
    files: &'a dyn FileStore,
    max_upload_bytes: usize,
}

impl<'a> BookService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database, files: &'a dyn FileStore, max_upload_bytes: usize) -> Self {
        Self {
            db,
            files,
            max_upload_bytes,
        }
    }

    /// One page of books, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn list(&self, page: PageRequest) -> Result<Paged<Book>, AppError> {
        Ok(self.db.list_books(page).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book does not exist.
    pub async fn get(&self, id: BookId) -> Result<Book, AppError> {
        self.db
            .get_book(id)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    /// Create a book in `store`, owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Denied` if the user's role may not create books,
    /// `AppError::NotFound` if the store does not exist, and
    /// `AppError::Validation` or a conflict for bad input.
    pub async fn create(&self, user: &User, store: StoreId, input: BookInput) -> Result<Book, AppError> {
        authorize_create(user, Resource::Book)?;
        if self.db.get_store(store).await?.is_none() {
            return Err(store_not_found(store));
        }

        let new_book = input.into_new_book(user.id, store)?;
        let book = self
            .db
            .create_book(new_book)
            .await
            .map_err(|e| match e {
                // The store vanished between the check and the insert.
                RepositoryError::NotFound => store_not_found(store),
                other => other.into(),
            })?;

        tracing::info!(book = %book.id, store = %store, owner = %user.id, "book created");
        Ok(book)
    }

    /// Update a book's descriptive fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book does not exist and
    /// `AppError::Denied` if the user may not modify it.
    pub async fn update(&self, user: &User, id: BookId, patch: BookPatch) -> Result<Book, AppError> {
        let existing = self.get(id).await?;
        authorize_mutation(user, existing.owner, Resource::Book, Action::Update)?;

        let changes = patch.into_changes()?;
        Ok(self.db.update_book(id, changes).await?)
    }

    /// Delete a book and its reviews.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the book does not exist and
    /// `AppError::Denied` if the user may not delete it.
    pub async fn delete(&self, user: &User, id: BookId) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        authorize_mutation(user, existing.owner, Resource::Book, Action::Delete)?;

        self.db.delete_book(id).await?;
        tracing::info!(book = %id, user = %user.id, "book deleted");
        Ok(())
    }

    /// Store an uploaded cover and point the book at it.
    ///
    /// Returns the stored file name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound`/`AppError::Denied` as for updates and
    /// `AppError::Upload` if the file is not an acceptable image or cannot be
    /// written.
    pub async fn upload_cover(
        &self,
        user: &User,
        id: BookId,
        upload: Option<CoverUpload>,
    ) -> Result<String, AppError> {
        let existing = self.get(id).await?;
        authorize_mutation(user, existing.owner, Resource::Book, Action::Update)?;

        let upload = upload.ok_or(UploadError::Missing)?;
        upload.validate(self.max_upload_bytes)?;

        let file_name = upload.stored_name(id);
        self.files.store(&file_name, &upload.bytes).await?;
        self.db.set_book_cover(id, &file_name).await?;

        tracing::info!(book = %id, file = %file_name, "book cover uploaded");
        Ok(file_name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use bookaholic_core::{Email, GeoPoint, Location, Role};

    use super::*;
    use crate::db::{MemoryDatabase, StoreRepository, UserRepository};
    use crate::models::{DEFAULT_COVER, NewStore, NewUser};
    use crate::services::guard::AccessDenied;
    use crate::services::testing::MemoryFileStore;

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

    async fn store(db: &MemoryDatabase, owner: &User) -> StoreId {
        db.create_store(NewStore {
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
        .unwrap()
        .id
    }

    fn dune() -> BookInput {
        BookInput {
            name: Some("Dune".to_owned()),
            description: Some("Spice.".to_owned()),
            price: Some(Decimal::new(999, 2)),
            author_name: Some("Frank Herbert".to_owned()),
        }
    }

    fn png(size: usize) -> CoverUpload {
        CoverUpload {
            file_name: Some("cover.png".to_owned()),
            content_type: Some("image/png".to_owned()),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    async fn test_create_in_existing_store() {
        let db = MemoryDatabase::new();
        let files = MemoryFileStore::default();
        let books = BookService::new(&db, &files, 1_000);
        let owner = user(&db, "owner@example.com", Role::StoreOwner).await;
        let store = store(&db, &owner).await;

        let book = books.create(&owner, store, dune()).await.unwrap();
        assert_eq!(book.store, store);
        assert_eq!(book.owner, owner.id);
        assert_eq!(book.average_rating, None);
        assert_eq!(book.book_cover, DEFAULT_COVER);

        assert!(matches!(
            books.create(&owner, store, dune()).await,
            Err(AppError::Database(RepositoryError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn test_create_checks_role_then_store() {
        let db = MemoryDatabase::new();
        let files = MemoryFileStore::default();
        let books = BookService::new(&db, &files, 1_000);
        let owner = user(&db, "owner@example.com", Role::StoreOwner).await;
        let reader = user(&db, "reader@example.com", Role::User).await;

        assert!(matches!(
            books.create(&reader, StoreId::new(404), dune()).await,
            Err(AppError::Denied(AccessDenied::RoleNotPermitted { .. }))
        ));
        assert!(matches!(
            books.create(&owner, StoreId::new(404), dune()).await,
            Err(AppError::NotFound(message)) if message == "Store not found with id of 404"
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_guarded() {
        let db = MemoryDatabase::new();
        let files = MemoryFileStore::default();
        let books = BookService::new(&db, &files, 1_000);
        let owner = user(&db, "owner@example.com", Role::StoreOwner).await;
        let rival = user(&db, "rival@example.com", Role::StoreOwner).await;
        let admin = user(&db, "admin@example.com", Role::Admin).await;
        let store = store(&db, &owner).await;
        let book = books.create(&owner, store, dune()).await.unwrap();

        let patch = || BookPatch {
            price: Some(Decimal::new(1299, 2)),
            ..BookPatch::default()
        };
        assert!(matches!(
            books.update(&rival, book.id, patch()).await,
            Err(AppError::Denied(AccessDenied::NotOwner { .. }))
        ));
        let updated = books.update(&owner, book.id, patch()).await.unwrap();
        assert_eq!(updated.price.amount(), Decimal::new(1299, 2));
        assert_eq!(updated.name, "Dune");

        assert!(matches!(
            books.delete(&rival, book.id).await,
            Err(AppError::Denied(_))
        ));
        books.delete(&admin, book.id).await.unwrap();
        assert!(matches!(
            books.get(book.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_cover() {
        let db = MemoryDatabase::new();
        let files = MemoryFileStore::default();
        let books = BookService::new(&db, &files, 1_000);
        let owner = user(&db, "owner@example.com", Role::StoreOwner).await;
        let store = store(&db, &owner).await;
        let book = books.create(&owner, store, dune()).await.unwrap();

        let name = books
            .upload_cover(&owner, book.id, Some(png(10)))
            .await
            .unwrap();
        assert_eq!(name, format!("photo_{}.png", book.id));
        assert_eq!(files.get(&name).await.unwrap(), vec![7; 10]);
        assert_eq!(books.get(book.id).await.unwrap().book_cover, name);
    }

    #[tokio::test]
    async fn test_upload_cover_rejections() {
        let db = MemoryDatabase::new();
        let files = MemoryFileStore::default();
        let books = BookService::new(&db, &files, 1_000);
        let owner = user(&db, "owner@example.com", Role::StoreOwner).await;
        let rival = user(&db, "rival@example.com", Role::StoreOwner).await;
        let store = store(&db, &owner).await;
        let book = books.create(&owner, store, dune()).await.unwrap();

        assert!(matches!(
            books.upload_cover(&owner, book.id, None).await,
            Err(AppError::Upload(UploadError::Missing))
        ));
        assert!(matches!(
            books.upload_cover(&owner, book.id, Some(png(1_001))).await,
            Err(AppError::Upload(UploadError::TooLarge { max: 1_000 }))
        ));
        let text = CoverUpload {
            content_type: Some("text/plain".to_owned()),
            ..png(1)
        };
        assert!(matches!(
            books.upload_cover(&owner, book.id, Some(text)).await,
            Err(AppError::Upload(UploadError::NotAnImage))
        ));
        assert!(matches!(
            books.upload_cover(&rival, book.id, Some(png(1))).await,
            Err(AppError::Denied(_))
        ));
        assert!(files.names().await.is_empty());
        assert_eq!(books.get(book.id).await.unwrap().book_cover, DEFAULT_COVER);
    }
}
