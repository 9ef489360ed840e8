//! Human-facing order numbers.
//!
//! Orders are numbered `ORD-<year>-<sequence>`, where the sequence is the
//! store-wide order count plus one, zero-padded to at least three digits.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An order number such as `ORD-2025-007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by every order number.
    pub const PREFIX: &'static str = "ORD";

    /// Build the number for the `sequence`-th order in the store, stamped
    /// with the `year` it was placed in. The sequence does not restart with
    /// the year.
    ///
    /// ```
    /// use shopfront_core::OrderNumber;
    ///
    /// assert_eq!(OrderNumber::new(2025, 7).as_str(), "ORD-2025-007");
    /// assert_eq!(OrderNumber::new(2025, 1234).as_str(), "ORD-2025-1234");
    /// ```
    #[must_use]
    pub fn new(year: i32, sequence: u64) -> Self {
        Self(format!("{}-{year}-{sequence:03}", Self::PREFIX))
    }

    /// Number for the order placed after `existing_orders` others, counted
    /// across all years.
    #[must_use]
    pub fn next(year: i32, existing_orders: u64) -> Self {
        Self::new(year, existing_orders.saturating_add(1))
    }

    /// Wrap a number read back from storage.
    #[must_use]
    pub const fn from_stored(number: String) -> Self {
        Self(number)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_order_in_the_store() {
        assert_eq!(OrderNumber::next(2024, 0).as_str(), "ORD-2024-001");
    }

    #[test]
    fn test_sequence_continues_across_years() {
        assert_eq!(OrderNumber::next(2025, 41).as_str(), "ORD-2025-042");
    }

    #[test]
    fn test_padding_stops_at_three_digits() {
        assert_eq!(OrderNumber::next(2024, 99).as_str(), "ORD-2024-100");
        assert_eq!(OrderNumber::next(2024, 999).as_str(), "ORD-2024-1000");
    }
}
