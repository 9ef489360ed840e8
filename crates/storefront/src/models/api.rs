//! JSON bodies exchanged between [`ApiClient`](crate::api_client::ApiClient)
//! and the `/api` routes.
//!
//! User keys arrive as plain strings so a missing or malformed key can be
//! answered with `400 Bad Request` rather than a deserialization rejection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::StoredCartLine;

use super::order::Order;
use super::user::{Address, ProfileUpdate, User};

/// `?userKey=` query parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKeyQuery {
    pub user_key: Option<String>,
}

/// `GET /api/cart` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub cart: Vec<StoredCartLine>,
}

/// `POST /api/cart` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCartRequest {
    #[serde(default)]
    pub user_key: String,
    #[serde(default)]
    pub cart: Vec<StoredCartLine>,
}

/// `POST /api/cart` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCartResponse {
    pub success: bool,
    pub message: String,
    pub cart: Vec<StoredCartLine>,
}

/// Acknowledgement with no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /api/users/sync` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    #[serde(default)]
    pub user_key: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: String,
}

/// `PUT /api/users/update` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub user_key: String,
    #[serde(flatten)]
    pub update: ProfileUpdate,
}

/// Response carrying a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

/// `POST /api/orders` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub user_key: String,
    pub items: Vec<StoredCartLine>,
    /// Client-computed total; when present it must match the items.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub shipping_address: Address,
    pub payment_method: String,
}

/// Response carrying one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

/// `GET /api/orders` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

/// Error body for every non-success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
