//! Stored cart route handlers.
//!
//! The cart is always written whole: clients send their complete local cart
//! and the stored copy is replaced atomically.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::models::api::{
    CartResponse, MessageResponse, ReplaceCartRequest, ReplaceCartResponse, UserKeyQuery,
};
use crate::state::AppState;

use super::{require_user_key, validate_lines};

/// `GET /api/cart?userKey=` - the stored cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<UserKeyQuery>,
) -> Result<Json<CartResponse>> {
    let key = require_user_key(query.user_key.as_deref())?;

    let cart = CartRepository::new(state.pool())
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(Json(CartResponse { cart }))
}

/// `POST /api/cart` - replace the stored cart.
#[instrument(skip(state, request), fields(lines = request.cart.len()))]
pub async fn replace(
    State(state): State<AppState>,
    Json(request): Json<ReplaceCartRequest>,
) -> Result<Json<ReplaceCartResponse>> {
    let key = require_user_key(Some(&request.user_key))?;
    validate_lines(&request.cart)?;

    CartRepository::new(state.pool())
        .replace(&key, &request.cart)
        .await?;
    tracing::debug!(user = %key, "cart replaced");

    Ok(Json(ReplaceCartResponse {
        success: true,
        message: "Cart updated".to_string(),
        cart: request.cart,
    }))
}

/// `DELETE /api/cart?userKey=` - empty the stored cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    Query(query): Query<UserKeyQuery>,
) -> Result<Json<MessageResponse>> {
    let key = require_user_key(query.user_key.as_deref())?;

    CartRepository::new(state.pool()).clear(&key).await?;
    tracing::debug!(user = %key, "cart cleared");

    Ok(Json(MessageResponse {
        success: true,
        message: "Cart cleared".to_string(),
    }))
}
