//! Book queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookaholic_core::{BookId, Price, StoreId, UserId};

use super::{PgDatabase, is_foreign_key_violation, is_unique_violation, limit_offset};
use crate::db::memory::DUPLICATE_BOOK_NAME;
use crate::db::{BookRepository, PageRequest, Paged, RepositoryError};
use crate::models::{Book, BookChanges, NewBook};

const BOOK_COLUMNS: &str = "id, name, description, price, author_name, average_rating, \
                            book_cover, owner_id, store_id, created_at";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    author_name: String,
    average_rating: Option<f64>,
    book_cover: String,
    owner_id: i32,
    store_id: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            id: BookId::new(row.id),
            name: row.name,
            description: row.description,
            price,
            author_name: row.author_name,
            average_rating: row.average_rating,
            book_cover: row.book_cover,
            owner: UserId::new(row.owner_id),
            store: StoreId::new(row.store_id),
            created_at: row.created_at,
        })
    }
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if is_unique_violation(&e) {
        return RepositoryError::Conflict(DUPLICATE_BOOK_NAME.to_owned());
    }
    if is_foreign_key_violation(&e) {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

fn collect_books(rows: Vec<BookRow>) -> Result<Vec<Book>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

#[async_trait]
impl BookRepository for PgDatabase {
    async fn create_book(&self, book: NewBook) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "INSERT INTO books (name, description, price, author_name, owner_id, store_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.name)
        .bind(&book.description)
        .bind(book.price.amount())
        .bind(&book.author_name)
        .bind(book.owner)
        .bind(book.store)
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;

        row.try_into()
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_books(&self, page: PageRequest) -> Result<Paged<Book>, RepositoryError> {
        let total = self.count("books").await?;
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(Paged {
            items: collect_books(rows)?,
            total,
            page,
        })
    }

    async fn books_for_store(&self, store: StoreId) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books
             WHERE store_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(store)
        .fetch_all(self.pool())
        .await?;

        collect_books(rows)
    }

    async fn update_book(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 author_name = COALESCE($5, author_name)
             WHERE id = $1
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price.map(Price::amount))
        .bind(changes.author_name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_write_error)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn set_book_cover(&self, id: BookId, file_name: &str) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "UPDATE books SET book_cover = $2 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(file_name)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn set_average_rating(
        &self,
        id: BookId,
        average: Option<f64>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE books SET average_rating = $2 WHERE id = $1")
            .bind(id)
            .bind(average)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
