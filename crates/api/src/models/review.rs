//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookaholic_core::{BookId, Rating, ReviewId, UserId};

use super::{ValidationError, optional_text, required_text};

const TITLE_MAX: usize = 100;

/// A user's review of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub title: String,
    pub text: String,
    pub rating: Rating,
    pub book: BookId,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

/// A review to be inserted.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub title: String,
    pub text: String,
    pub rating: Rating,
    pub book: BookId,
    pub owner: UserId,
}

/// Field changes for a review.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<Rating>,
}

/// Request body for creating a review.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

impl ReviewInput {
    /// Validate into a review of `book` owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for missing fields or an out-of-range rating.
    pub fn into_new_review(self, owner: UserId, book: BookId) -> Result<NewReview, ValidationError> {
        Ok(NewReview {
            title: required_text("title", self.title, Some(TITLE_MAX))?,
            text: review_text(self.text)?,
            rating: parse_rating(self.rating.ok_or(ValidationError::Required("rating"))?)?,
            book,
            owner,
        })
    }
}

/// Request body for updating a review. Book and owner are not accepted.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

impl ReviewPatch {
    /// Validate into review changes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for blank fields or an out-of-range rating.
    pub fn into_changes(self) -> Result<ReviewChanges, ValidationError> {
        Ok(ReviewChanges {
            title: optional_text("title", self.title, Some(TITLE_MAX))?,
            text: self.text.map(|t| review_text(Some(t))).transpose()?,
            rating: self.rating.map(parse_rating).transpose()?,
        })
    }
}

/// Review bodies are kept verbatim; only an empty body is rejected.
fn review_text(value: Option<String>) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Required("text"))
}

fn parse_rating(value: i64) -> Result<Rating, ValidationError> {
    Rating::new(value).map_err(|e| ValidationError::Invalid {
        field: "rating",
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_into_new_review() {
        let input = ReviewInput {
            title: Some(" Great ".to_owned()),
            text: Some("Loved it".to_owned()),
            rating: Some(8),
        };
        let review = input
            .into_new_review(UserId::new(3), BookId::new(4))
            .unwrap();
        assert_eq!(review.title, "Great");
        assert_eq!(review.text, "Loved it");
        assert_eq!(review.rating.value(), 8);
        assert_eq!(review.owner, UserId::new(3));
    }

    #[test]
    fn test_rating_out_of_range() {
        for rating in [0, 11] {
            let input = ReviewInput {
                title: Some("t".to_owned()),
                text: Some("x".to_owned()),
                rating: Some(rating),
            };
            assert!(matches!(
                input.into_new_review(UserId::new(1), BookId::new(1)),
                Err(ValidationError::Invalid {
                    field: "rating",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_missing_rating() {
        let input = ReviewInput {
            title: Some("t".to_owned()),
            text: Some("x".to_owned()),
            rating: None,
        };
        assert_eq!(
            input
                .into_new_review(UserId::new(1), BookId::new(1))
                .unwrap_err(),
            ValidationError::Required("rating")
        );
    }

    #[test]
    fn test_patch_ignores_book_and_owner() {
        let patch: ReviewPatch =
            serde_json::from_str(r#"{"rating":3,"book":9,"owner":9}"#).unwrap();
        let changes = patch.into_changes().unwrap();
        assert_eq!(changes.rating.map(Rating::value), Some(3));
        assert!(changes.title.is_none());
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let input = ReviewInput {
            title: Some(" Great ".to_owned()),
            text: Some("  indented\n".to_owned()),
            rating: Some(8),
        };
        let review = input
            .into_new_review(UserId::new(3), BookId::new(4))
            .unwrap();
        assert_eq!(review.title, "Great");
        assert_eq!(review.text, "  indented\n");

        let patch: ReviewPatch = serde_json::from_str(r#"{"text":""}"#).unwrap();
        assert_eq!(
            patch.into_changes().unwrap_err(),
            ValidationError::Required("text")
        );
    }
}
