//! Shopfront Core - Shared types and the cart state machine.
//!
//! This crate provides the types used across all Shopfront components:
//! - `storefront` - Persistence API server and the client-side cart session
//! - `cli` - Command-line tools for migrations and interactive cart sessions
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no database access, no HTTP clients. The cart state machine lives here so
//! it can be exercised synchronously; the storefront crate wraps it in the
//! sync coordinator.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, keys, prices, emails, and statuses
//! - [`cart`] - Cart lines, the cart reducer, and boundary validation
//! - [`order`] - Order number formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod types;

pub use cart::{CartAction, CartLine, CartState, CartValidationError, Item, StoredCartLine};
pub use order::OrderNumber;
pub use types::*;
