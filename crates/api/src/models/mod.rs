//! Domain models and request inputs.
//!
//! Domain types serialize to the public JSON shape (camelCase). Request
//! inputs are permissive on deserialization and validated explicitly so that
//! missing fields produce readable messages instead of serde errors.

pub mod book;
pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use book::{Book, BookChanges, BookInput, BookPatch, DEFAULT_COVER, NewBook};
pub use review::{NewReview, Review, ReviewChanges, ReviewInput, ReviewPatch};
pub use session::session_keys;
pub use store::{NewStore, Store, StoreChanges, StoreInput, StorePatch, StoreWithBooks};
pub use user::{NewUser, ResetToken, User, UserChanges, UserInput, UserPatch};

use thiserror::Error;

/// Input validation failures. All map to 400 Bad Request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("Please add a {0}")]
    Required(&'static str),

    /// A field exceeded its maximum length.
    #[error("{field} cannot be more than {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A field was present but malformed.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Trim a required text field and enforce its maximum length.
///
/// # Errors
///
/// Returns `Required` for missing or blank values, `TooLong` past `max` chars.
pub fn required_text(
    field: &'static str,
    value: Option<String>,
    max: Option<usize>,
) -> Result<String, ValidationError> {
    let value = value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Required(field))?;
    check_length(field, &value, max)?;
    Ok(value)
}

/// Like [`required_text`], but absent values pass through as `None`.
///
/// A present-but-blank value is still rejected.
///
/// # Errors
///
/// Returns `Required` for blank values, `TooLong` past `max` chars.
pub fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: Option<usize>,
) -> Result<Option<String>, ValidationError> {
    value
        .map(|v| required_text(field, Some(v), max))
        .transpose()
}

fn check_length(field: &'static str, value: &str, max: Option<usize>) -> Result<(), ValidationError> {
    match max {
        Some(max) if value.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        let value = required_text("name", Some("  Dune  ".to_owned()), Some(50)).unwrap();
        assert_eq!(value, "Dune");
    }

    #[test]
    fn test_required_text_rejects_blank_and_missing() {
        assert_eq!(
            required_text("name", None, None),
            Err(ValidationError::Required("name"))
        );
        assert_eq!(
            required_text("name", Some("   ".to_owned()), None),
            Err(ValidationError::Required("name"))
        );
    }

    #[test]
    fn test_length_counts_chars_after_trim() {
        assert!(required_text("title", Some(format!(" {} ", "é".repeat(5))), Some(5)).is_ok());
        assert_eq!(
            required_text("title", Some("abcdef".to_owned()), Some(5)),
            Err(ValidationError::TooLong {
                field: "title",
                max: 5
            })
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("name", None, Some(5)), Ok(None));
        assert_eq!(
            optional_text("name", Some(" ok ".to_owned()), Some(5)),
            Ok(Some("ok".to_owned()))
        );
        assert!(optional_text("name", Some(String::new()), Some(5)).is_err());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ValidationError::Required("title").to_string(),
            "Please add a title"
        );
        assert_eq!(
            ValidationError::TooLong {
                field: "name",
                max: 50
            }
            .to_string(),
            "name cannot be more than 50 characters"
        );
    }
}
