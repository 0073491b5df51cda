//! Book domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookaholic_core::{BookId, Price, StoreId, UserId};

use super::{ValidationError, optional_text, required_text};

/// Cover file name used until a photo is uploaded.
pub const DEFAULT_COVER: &str = "no-photo.jpg";

const NAME_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 500;
const AUTHOR_NAME_MAX: usize = 100;

/// A book listed in a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub author_name: String,
    /// Mean rating of the book's reviews, absent until the first review.
    pub average_rating: Option<f64>,
    pub book_cover: String,
    pub owner: UserId,
    pub store: StoreId,
    pub created_at: DateTime<Utc>,
}

/// A book to be inserted. New books start without a rating and with the
/// default cover.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub author_name: String,
    pub owner: UserId,
    pub store: StoreId,
}

/// Field changes for a book.
///
/// `average_rating` and `book_cover` are absent on purpose: they have
/// dedicated write paths.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub author_name: Option<String>,
}

/// Request body for creating a book.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub author_name: Option<String>,
}

impl BookInput {
    /// Validate into a book owned by `owner` in `store`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for missing, overlong, or negative fields.
    pub fn into_new_book(self, owner: UserId, store: StoreId) -> Result<NewBook, ValidationError> {
        Ok(NewBook {
            name: required_text("name", self.name, Some(NAME_MAX))?,
            description: required_text("description", self.description, Some(DESCRIPTION_MAX))?,
            price: parse_price(self.price.ok_or(ValidationError::Required("price"))?)?,
            author_name: required_text("author name", self.author_name, Some(AUTHOR_NAME_MAX))?,
            owner,
            store,
        })
    }
}

/// Request body for updating a book. Rating, cover, owner, and store are
/// not accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub author_name: Option<String>,
}

impl BookPatch {
    /// Validate into book changes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for blank, overlong, or negative fields.
    pub fn into_changes(self) -> Result<BookChanges, ValidationError> {
        Ok(BookChanges {
            name: optional_text("name", self.name, Some(NAME_MAX))?,
            description: optional_text("description", self.description, Some(DESCRIPTION_MAX))?,
            price: self.price.map(parse_price).transpose()?,
            author_name: optional_text("author name", self.author_name, Some(AUTHOR_NAME_MAX))?,
        })
    }
}

fn parse_price(amount: Decimal) -> Result<Price, ValidationError> {
    Price::new(amount).map_err(|e| ValidationError::Invalid {
        field: "price",
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dune() -> BookInput {
        serde_json::from_str(
            r#"{"name":" Dune ","description":"Desert planet","price":9.99,"authorName":"Frank Herbert"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_into_new_book() {
        let book = dune()
            .into_new_book(UserId::new(1), StoreId::new(2))
            .unwrap();
        assert_eq!(book.name, "Dune");
        assert_eq!(book.price.amount(), Decimal::new(999, 2));
        assert_eq!(book.store, StoreId::new(2));
    }

    #[test]
    fn test_name_limit_is_fifty() {
        let mut input = dune();
        input.name = Some("n".repeat(51));
        assert_eq!(
            input
                .into_new_book(UserId::new(1), StoreId::new(1))
                .unwrap_err(),
            ValidationError::TooLong {
                field: "name",
                max: 50
            }
        );
    }

    #[test]
    fn test_missing_price() {
        let mut input = dune();
        input.price = None;
        assert_eq!(
            input
                .into_new_book(UserId::new(1), StoreId::new(1))
                .unwrap_err(),
            ValidationError::Required("price")
        );
    }

    #[test]
    fn test_patch_rejects_negative_price_and_ignores_rating() {
        let patch: BookPatch =
            serde_json::from_str(r#"{"price":-1,"averageRating":10}"#).unwrap();
        assert!(matches!(
            patch.into_changes(),
            Err(ValidationError::Invalid { field: "price", .. })
        ));

        let patch: BookPatch = serde_json::from_str(r#"{"averageRating":10}"#).unwrap();
        let changes = patch.into_changes().unwrap();
        assert!(changes.name.is_none() && changes.price.is_none());
    }

    #[test]
    fn test_price_outside_column_range_is_invalid() {
        for price in ["9.999", "100000000000"] {
            let patch: BookPatch =
                serde_json::from_str(&format!(r#"{{"price":"{price}"}}"#)).unwrap();
            assert!(
                matches!(
                    patch.into_changes(),
                    Err(ValidationError::Invalid { field: "price", .. })
                ),
                "price {price}"
            );
        }
    }
}
