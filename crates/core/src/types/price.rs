//! Book prices using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest number of decimal places a price may carry.
pub const PRICE_SCALE: u32 = 2;

/// Largest representable price, matching the `NUMERIC(12, 2)` column.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Error returned for a price that cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price cannot be negative, got {0}")]
    Negative(Decimal),

    #[error("price cannot have more than {PRICE_SCALE} decimal places, got {0}")]
    TooPrecise(Decimal),

    #[error("price cannot exceed {MAX_PRICE}, got {0}")]
    TooLarge(Decimal),
}

/// A non-negative book price in the store's currency, with at most two
/// decimal places.
///
/// Serialized as a decimal string (e.g. `"12.99"`) so no precision is lost;
/// both JSON numbers and strings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price.
    ///
    /// Trailing zeros do not count towards the scale, so `9.990` is accepted.
    /// The amount is always held with exactly two decimal places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if `amount` is negative, has more than two
    /// decimal places, or exceeds [`MAX_PRICE`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount.normalize().scale() > PRICE_SCALE {
            return Err(PriceError::TooPrecise(amount));
        }
        if amount > MAX_PRICE {
            return Err(PriceError::TooLarge(amount));
        }
        let mut amount = amount;
        amount.rescale(PRICE_SCALE);
        Ok(Self(amount))
    }

    /// The amount as a decimal.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(Price::new(Decimal::new(-1, 2)).is_err());
        assert!(Price::new(Decimal::ZERO).is_ok());
        assert!(Price::new(Decimal::new(1299, 2)).is_ok());
    }

    #[test]
    fn test_rejects_what_the_column_cannot_hold() {
        assert!(matches!(
            Price::new(Decimal::new(9999, 3)),
            Err(PriceError::TooPrecise(_))
        ));
        let price = Price::new(Decimal::new(9990, 3)).unwrap();
        assert_eq!(price.amount(), Decimal::new(999, 2));
        assert_eq!(price.amount().to_string(), "9.99");
        assert_eq!(
            serde_json::to_string(&Price::new(Decimal::TEN).unwrap()).unwrap(),
            "\"10.00\""
        );

        assert_eq!(MAX_PRICE, "9999999999.99".parse::<Decimal>().unwrap());
        assert!(Price::new(MAX_PRICE).is_ok());
        assert!(matches!(
            Price::new(Decimal::new(100_000_000_000, 0)),
            Err(PriceError::TooLarge(_))
        ));
    }

    #[test]
    fn test_display_two_places() {
        let price = Price::new(Decimal::new(5, 0)).unwrap();
        assert_eq!(price.to_string(), "5.00");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Price = serde_json::from_str("12.99").unwrap();
        let from_string: Price = serde_json::from_str("\"12.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.amount(), Decimal::new(1299, 2));
        assert!(serde_json::from_str::<Price>("-4").is_err());
    }
}
