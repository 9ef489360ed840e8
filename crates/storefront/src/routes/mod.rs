//! HTTP route handlers for the persistence API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Health check
//! GET    /health/ready          - Database readiness
//!
//! # Cart
//! GET    /api/cart?userKey=     - Stored cart
//! POST   /api/cart              - Replace stored cart
//! DELETE /api/cart?userKey=     - Clear stored cart
//!
//! # Users
//! POST   /api/users/sync        - Create or refresh a user
//! GET    /api/users/{userKey}   - User profile
//! PUT    /api/users/update      - Partial profile update
//!
//! # Orders
//! GET    /api/orders?userKey=   - Recent orders, newest first
//! POST   /api/orders            - Place an order
//! ```

pub mod cart;
pub mod orders;
pub mod users;

use std::collections::HashSet;

use axum::{
    Router,
    routing::{get, post, put},
};

use shopfront_core::{StoredCartLine, UserKey};

use crate::error::AppError;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(cart::show).post(cart::replace).delete(cart::clear),
    )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(users::sync))
        .route("/update", put(users::update))
        .route("/{user_key}", get(users::show))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::index).post(orders::create))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/cart", cart_routes())
        .nest("/api/users", user_routes())
        .nest("/api/orders", order_routes())
}

/// Parse a user key sent by a client.
fn require_user_key(raw: Option<&str>) -> Result<UserKey, AppError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("userKey is required".to_string()))?;
    UserKey::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid userKey: {e}")))
}

/// Validate client-sent cart lines and reject repeated product ids.
fn validate_lines(lines: &[StoredCartLine]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        line.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if !seen.insert(line.product_id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "duplicate product {} in cart",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::models::api::ErrorResponse;

    /// Router over a pool that never connects; only requests rejected before
    /// touching the database may be sent through it.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/shopfront_test")
            .unwrap();
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/shopfront_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            sentry_dsn: None,
            sentry_environment: None,
        };
        routes().with_state(AppState::new(config, pool))
    }

    fn line(id: &str, quantity: i64) -> StoredCartLine {
        StoredCartLine {
            product_id: id.to_string(),
            name: format!("Product {id}"),
            price: Decimal::from(5),
            image: String::new(),
            description: String::new(),
            category: String::new(),
            quantity,
        }
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, body.error)
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_require_user_key() {
        assert!(require_user_key(None).is_err());
        assert!(require_user_key(Some("  ")).is_err());
        assert!(require_user_key(Some("has space")).is_err());
        assert_eq!(require_user_key(Some("uid-1")).unwrap().as_str(), "uid-1");
    }

    #[test]
    fn test_validate_lines_rejects_duplicates() {
        assert!(validate_lines(&[line("1", 1), line("2", 3)]).is_ok());
        assert!(validate_lines(&[line("1", 1), line("1", 3)]).is_err());
        assert!(validate_lines(&[line("1", 0)]).is_err());
    }

    #[tokio::test]
    async fn test_get_cart_requires_user_key() {
        let request = Request::get("/api/cart").body(Body::empty()).unwrap();
        let (status, error) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "userKey is required");
    }

    #[tokio::test]
    async fn test_delete_cart_requires_user_key() {
        let request = Request::delete("/api/cart?userKey=")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_replace_cart_rejects_invalid_line() {
        let body = serde_json::json!({
            "userKey": "uid-1",
            "cart": [serde_json::to_value(line("1", -2)).unwrap()],
        });
        let (status, _) = send(post_json("/api/cart", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_order_requires_items() {
        let body = serde_json::json!({
            "userKey": "uid-1",
            "items": [],
            "paymentMethod": "card",
        });
        let (status, _) = send(post_json("/api/orders", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_order_rejects_wrong_total() {
        let body = serde_json::json!({
            "userKey": "uid-1",
            "items": [serde_json::to_value(line("1", 2)).unwrap()],
            "totalAmount": 99.0,
            "paymentMethod": "card",
        });
        let (status, error) = send(post_json("/api/orders", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.contains("total"));
    }

    #[tokio::test]
    async fn test_create_order_rejects_total_out_of_range() {
        let heavy = |id: &str| {
            let mut line = line(id, 4_000_000_000);
            line.price = Decimal::from(10_u64.pow(19));
            serde_json::to_value(line).unwrap()
        };
        let body = serde_json::json!({
            "userKey": "uid-1",
            "items": [heavy("1"), heavy("2")],
            "paymentMethod": "card",
        });
        let (status, error) = send(post_json("/api/orders", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "order total is out of range");
    }

    #[tokio::test]
    async fn test_replace_cart_rejects_line_subtotal_out_of_range() {
        let mut huge = line("1", 4_000_000_000);
        huge.price = Decimal::from_i128_with_scale(10_i128.pow(21), 0);
        let body = serde_json::json!({
            "userKey": "uid-1",
            "cart": [serde_json::to_value(huge).unwrap()],
        });
        let (status, error) = send(post_json("/api/cart", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.contains("out of range"));
    }

    #[tokio::test]
    async fn test_sync_user_rejects_bad_email() {
        let body = serde_json::json!({
            "userKey": "uid-1",
            "email": "not-an-email",
            "name": "Ada",
        });
        let (status, _) = send(post_json("/api/users/sync", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
