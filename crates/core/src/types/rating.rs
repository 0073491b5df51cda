//! Review ratings and their aggregate.

use serde::{Deserialize, Serialize};

/// Error returned when a rating is outside the accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between {min} and {max}, got {value}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub value: i64,
}

/// A review rating, an integer in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 10;

    /// Create a rating, rejecting values outside `1..=10`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if `value` is out of range.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { value })
    }

    /// The rating as an integer.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arithmetic mean of a set of ratings.
///
/// Returns `None` for an empty set. The result is not rounded.
#[must_use]
pub fn average_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.0)).sum();
    #[allow(clippy::cast_precision_loss)] // review counts never approach 2^52
    let count = ratings.len() as f64;
    Some(f64::from(sum) / count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_bounds() {
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(10).is_ok());
        assert_eq!(Rating::new(0), Err(RatingError { value: 0 }));
        assert_eq!(Rating::new(11), Err(RatingError { value: 11 }));
        assert_eq!(Rating::new(-3), Err(RatingError { value: -3 }));
        assert_eq!(Rating::new(300), Err(RatingError { value: 300 }));
    }

    #[test]
    fn test_average_of_empty_set_is_none() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn test_average_is_plain_mean() {
        assert_eq!(average_rating(&ratings(&[8])), Some(8.0));
        assert_eq!(average_rating(&ratings(&[8, 4])), Some(6.0));
        assert_eq!(average_rating(&ratings(&[1, 2])), Some(1.5));
    }

    #[test]
    fn test_average_is_not_rounded() {
        let avg = average_rating(&ratings(&[10, 9, 9])).unwrap();
        assert!((avg - 28.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_and_fractions() {
        let rating: Rating = serde_json::from_str("7").unwrap();
        assert_eq!(rating.value(), 7);
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert!(serde_json::from_str::<Rating>("11").is_err());
        assert!(serde_json::from_str::<Rating>("7.5").is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            Rating::new(12).unwrap_err().to_string(),
            "rating must be between 1 and 10, got 12"
        );
    }
}
