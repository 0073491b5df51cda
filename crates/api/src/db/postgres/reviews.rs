//! Review queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookaholic_core::{BookId, Rating, ReviewId, UserId};

use super::{PgDatabase, is_foreign_key_violation, limit_offset};
use crate::db::{PageRequest, Paged, RepositoryError, ReviewRepository};
use crate::models::{NewReview, Review, ReviewChanges};

const REVIEW_COLUMNS: &str = "id, title, text, rating, book_id, owner_id, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    title: String,
    text: String,
    rating: i16,
    book_id: i32,
    owner_id: i32,
    created_at: DateTime<Utc>,
}

fn rating_from_column(value: i16) -> Result<Rating, RepositoryError> {
    Rating::new(i64::from(value)).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
    })
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReviewId::new(row.id),
            title: row.title,
            text: row.text,
            rating: rating_from_column(row.rating)?,
            book: BookId::new(row.book_id),
            owner: UserId::new(row.owner_id),
            created_at: row.created_at,
        })
    }
}

fn collect_reviews(rows: Vec<ReviewRow>) -> Result<Vec<Review>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

#[async_trait]
impl ReviewRepository for PgDatabase {
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "INSERT INTO reviews (title, text, rating, book_id, owner_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(&review.title)
        .bind(&review.text)
        .bind(i16::from(review.rating.value()))
        .bind(review.book)
        .bind(review.owner)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_reviews(&self, page: PageRequest) -> Result<Paged<Review>, RepositoryError> {
        let total = self.count("reviews").await?;
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(Paged {
            items: collect_reviews(rows)?,
            total,
            page,
        })
    }

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE book_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(book)
        .fetch_all(self.pool())
        .await?;

        collect_reviews(rows)
    }

    async fn ratings_for_book(&self, book: BookId) -> Result<Vec<Rating>, RepositoryError> {
        let values: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE book_id = $1")
            .bind(book)
            .fetch_all(self.pool())
            .await?;

        values.into_iter().map(rating_from_column).collect()
    }

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "UPDATE reviews
             SET title = COALESCE($2, title),
                 text = COALESCE($3, text),
                 rating = COALESCE($4, rating)
             WHERE id = $1
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.text)
        .bind(changes.rating.map(|r| i16::from(r.value())))
        .fetch_optional(self.pool())
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
