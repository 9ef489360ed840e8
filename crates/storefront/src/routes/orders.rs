//! Order route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use tracing::instrument;

use shopfront_core::StoredCartLine;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::NewOrder;
use crate::models::api::{CreateOrderRequest, OrderResponse, OrdersResponse, UserKeyQuery};
use crate::state::AppState;

use super::{require_user_key, validate_lines};

/// `GET /api/orders?userKey=` - the user's most recent orders.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<UserKeyQuery>,
) -> Result<Json<OrdersResponse>> {
    let key = require_user_key(query.user_key.as_deref())?;

    let user_id = UserRepository::new(state.pool())
        .id_for_key(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    let orders = OrderRepository::new(state.pool())
        .list_recent(user_id)
        .await?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// `POST /api/orders` - place an order.
#[instrument(skip(state, request), fields(user = %request.user_key, items = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let key = require_user_key(Some(&request.user_key))?;
    if request.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_string()));
    }
    validate_lines(&request.items)?;
    if request.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest("paymentMethod is required".to_string()));
    }

    let total = order_total(&request.items)
        .ok_or_else(|| AppError::BadRequest("order total is out of range".to_string()))?;
    if let Some(claimed) = request.total_amount
        && claimed.round_dp(2) != total.round_dp(2)
    {
        return Err(AppError::BadRequest(format!(
            "totalAmount {claimed} does not match item total {total}"
        )));
    }

    let user_id = UserRepository::new(state.pool())
        .id_for_key(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            user_id,
            items: request.items,
            total_amount: total,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
        })
        .await?;
    tracing::info!(order_number = %order.order_number, "order created");

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            order,
        }),
    ))
}

/// Σ(price × quantity), or `None` if it exceeds the decimal range.
fn order_total(items: &[StoredCartLine]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |total, line| {
        total.checked_add(line.price.checked_mul(Decimal::from(line.quantity))?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_total() {
        let line = |price: i64, quantity: i64| StoredCartLine {
            product_id: format!("p{price}"),
            name: "Thing".to_string(),
            price: Decimal::new(price, 2),
            image: String::new(),
            description: String::new(),
            category: String::new(),
            quantity,
        };
        assert_eq!(
            order_total(&[line(1050, 2), line(199, 1)]),
            Some(Decimal::new(2299, 2))
        );
        assert_eq!(order_total(&[]), Some(Decimal::ZERO));

        let heavy = StoredCartLine {
            price: Decimal::from(10_u64.pow(19)),
            ..line(0, 4_000_000_000)
        };
        assert_eq!(order_total(&[heavy.clone(), heavy]), None);
    }
}
