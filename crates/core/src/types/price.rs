//! Non-negative unit prices using decimal arithmetic.
//!
//! Prices travel over the wire as JSON numbers (the persistence API stores them
//! as plain numbers) but are held as [`Decimal`] so cart totals never pick up
//! floating point drift.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A unit price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from an amount in cents.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `cents` is below zero.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, or `None` if it exceeds the decimal range.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_checked_times() {
        let price = Price::from_cents(1999).unwrap();
        assert_eq!(price.checked_times(3), Some(Decimal::new(5997, 2)));
        assert_eq!(price.checked_times(0), Some(Decimal::ZERO));
    }

    #[test]
    fn test_checked_times_overflow() {
        let price = Price::new(Decimal::MAX).unwrap();
        assert_eq!(price.checked_times(1), Some(Decimal::MAX));
        assert_eq!(price.checked_times(2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(500).unwrap().to_string(), "$5.00");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_cents(1250).unwrap()).unwrap();
        assert_eq!(json, "12.5");
    }

    #[test]
    fn test_deserializes_numbers_and_rejects_negative() {
        let price: Price = serde_json::from_str("50").unwrap();
        assert_eq!(price.amount(), Decimal::from(50));
        assert!(serde_json::from_str::<Price>("-2.5").is_err());

        let quoted: Price = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(quoted.amount(), Decimal::new(1999, 2));
    }
}
