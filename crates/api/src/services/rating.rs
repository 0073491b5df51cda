//! Average rating maintenance.

use bookaholic_core::{BookId, average_rating};

use crate::db::{Database, RepositoryError};

/// Recompute and store the average rating of `book` from its current reviews.
///
/// Must run after every review create, update, and delete. Always re-reads
/// the full review set. Failures (for example the book was deleted in the
/// meantime) are logged and never returned: the review change that triggered
/// the recompute stays committed.
pub async fn recompute_average_rating(db: &dyn Database, book: BookId) {
    match write_average(db, book).await {
        Ok(average) => {
            tracing::debug!(book = %book, average = ?average, "average rating updated");
        }
        Err(e) => {
            tracing::error!(book = %book, error = %e, "failed to update average rating");
        }
    }
}

async fn write_average(db: &dyn Database, book: BookId) -> Result<Option<f64>, RepositoryError> {
    let ratings = db.ratings_for_book(book).await?;
    let average = average_rating(&ratings);
    db.set_average_rating(book, average).await?;
    Ok(average)
}
