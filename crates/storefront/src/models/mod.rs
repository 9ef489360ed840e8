//! Domain models for the storefront.
//!
//! - [`user`] - stored users, profiles and addresses
//! - [`order`] - placed orders
//! - [`session`] - the signed-in identity seen by the cart session
//! - [`api`] - request/response bodies of the `/api` routes

pub mod api;
pub mod order;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order};
pub use session::SessionUser;
pub use user::{Address, ProfileUpdate, User, UserProfile};
