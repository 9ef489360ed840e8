//! Wire/storage shape of a cart line and the boundary validation applied when
//! mapping it into a [`CartLine`].

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartLine, Item};
use crate::types::{ItemId, Price};

/// Errors raised when stored cart data cannot become a [`CartLine`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartValidationError {
    #[error("cart line is missing a product id")]
    MissingProductId,

    #[error("cart line {product_id} is missing a name")]
    MissingName { product_id: String },

    #[error("cart line {product_id} has a negative price ({price})")]
    NegativePrice { product_id: String, price: Decimal },

    #[error("cart line {product_id} has a non-positive quantity ({quantity})")]
    NonPositiveQuantity { product_id: String, quantity: i64 },

    #[error("cart line {product_id} quantity {quantity} is too large")]
    QuantityTooLarge { product_id: String, quantity: i64 },

    #[error("cart line {product_id} subtotal is out of range")]
    SubtotalOutOfRange { product_id: String },
}

/// A cart line as stored by the persistence service.
///
/// Field names follow the persistence API's JSON (`productId`, `price` as a
/// number). Values are unchecked until converted with
/// [`TryFrom<StoredCartLine>`](CartLine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCartLine {
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub quantity: i64,
}

impl StoredCartLine {
    /// Check the line without consuming it.
    ///
    /// # Errors
    ///
    /// Returns the first rule the line violates.
    pub fn validate(&self) -> Result<(), CartValidationError> {
        self.checked_parts().map(|_| ())
    }

    fn checked_parts(&self) -> Result<(Price, NonZeroU32), CartValidationError> {
        if self.product_id.trim().is_empty() {
            return Err(CartValidationError::MissingProductId);
        }
        if self.name.trim().is_empty() {
            return Err(CartValidationError::MissingName {
                product_id: self.product_id.clone(),
            });
        }
        let price = Price::new(self.price).map_err(|_| CartValidationError::NegativePrice {
            product_id: self.product_id.clone(),
            price: self.price,
        })?;
        if self.quantity <= 0 {
            return Err(CartValidationError::NonPositiveQuantity {
                product_id: self.product_id.clone(),
                quantity: self.quantity,
            });
        }
        let quantity = u32::try_from(self.quantity)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| CartValidationError::QuantityTooLarge {
                product_id: self.product_id.clone(),
                quantity: self.quantity,
            })?;
        if price.checked_times(quantity.get()).is_none() {
            return Err(CartValidationError::SubtotalOutOfRange {
                product_id: self.product_id.clone(),
            });
        }
        Ok((price, quantity))
    }
}

impl TryFrom<StoredCartLine> for CartLine {
    type Error = CartValidationError;

    fn try_from(stored: StoredCartLine) -> Result<Self, Self::Error> {
        let (price, quantity) = stored.checked_parts()?;
        Ok(Self::new(
            Item {
                id: ItemId::from(stored.product_id),
                name: stored.name,
                price,
                image: stored.image,
                description: stored.description,
                category: stored.category,
            },
            quantity,
        ))
    }
}

impl From<&CartLine> for StoredCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.item.id.to_string(),
            name: line.item.name.clone(),
            price: line.item.price.amount(),
            image: line.item.image.clone(),
            description: line.item.description.clone(),
            category: line.item.category.clone(),
            quantity: i64::from(line.quantity.get()),
        }
    }
}
