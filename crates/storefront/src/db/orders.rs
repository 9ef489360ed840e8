//! Order repository.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use shopfront_core::{OrderId, OrderNumber, OrderStatus, PaymentStatus, StoredCartLine, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Address, NewOrder, Order};

/// Advisory lock key held while an order number is assigned.
const ORDER_NUMBER_LOCK: i64 = 0x5348_4f50_4f52_4430;

/// Number of orders returned by [`OrderRepository::list_recent`].
pub const RECENT_ORDERS_LIMIT: i64 = 10;

const ORDER_COLUMNS: &str = "id, user_id, order_number, items, total_amount, shipping_address, \
     payment_method, status, payment_status, created_at";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    order_number: String,
    items: Json<Vec<StoredCartLine>>,
    total_amount: Decimal,
    shipping_address: Json<Address>,
    payment_method: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: OrderId::new(r.id),
            user_id: UserId::new(r.user_id),
            order_number: OrderNumber::from_stored(r.order_number),
            items: r.items.0,
            total_amount: r.total_amount,
            shipping_address: r.shipping_address.0,
            payment_method: r.payment_method,
            status: r.status,
            payment_status: r.payment_status,
            created_at: r.created_at,
        }
    }
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The most recent orders of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.order
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(user_id.as_i64())
        .bind(RECENT_ORDERS_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Insert an order, assigning the next order number.
    ///
    /// Numbering takes a transaction-scoped advisory lock, so concurrent
    /// inserts cannot draw the same number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ORDER_NUMBER_LOCK)
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.order")
            .fetch_one(&mut *tx)
            .await?;
        let existing = u64::try_from(existing).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative order count: {existing}"))
        })?;
        let number = OrderNumber::next(Utc::now().year(), existing);

        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.order
                (user_id, order_number, items, total_amount, shipping_address, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id.as_i64())
        .bind(number.as_str())
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("order number already exists"))?;

        tx.commit().await?;
        Ok(Order::from(row))
    }
}
