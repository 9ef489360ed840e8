//! Stored cart repository.
//!
//! A cart is replaced as a whole: the lines are deleted and re-inserted in one
//! transaction, so readers never observe a partially written cart.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use shopfront_core::{StoredCartLine, UserKey};

use super::{RepositoryError, conflict_on_unique};

#[derive(Debug, FromRow)]
struct CartLineRow {
    product_id: String,
    name: String,
    price: Decimal,
    image: String,
    description: String,
    category: String,
    quantity: i64,
}

impl From<CartLineRow> for StoredCartLine {
    fn from(r: CartLineRow) -> Self {
        Self {
            product_id: r.product_id,
            name: r.name,
            price: r.price,
            image: r.image,
            description: r.description,
            category: r.category,
            quantity: r.quantity,
        }
    }
}

/// Repository for stored carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored cart of the user with `key`, in insertion order.
    ///
    /// Returns `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &UserKey) -> Result<Option<Vec<StoredCartLine>>, RepositoryError> {
        let user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM shop.user WHERE user_key = $1")
            .bind(key.as_str())
            .fetch_optional(self.pool)
            .await?;
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT product_id, name, price, image, description, category, quantity
            FROM shop.cart_line
            WHERE user_id = $1
            ORDER BY position
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(rows.into_iter().map(StoredCartLine::from).collect()))
    }

    /// Replace the stored cart of the user with `key`.
    ///
    /// Lines must already be validated and free of duplicate product ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if two lines share a product id.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn replace(
        &self,
        key: &UserKey,
        lines: &[StoredCartLine],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent replacements of the same cart.
        let user_id: i64 =
            sqlx::query_scalar("SELECT id FROM shop.user WHERE user_key = $1 FOR UPDATE")
                .bind(key.as_str())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM shop.cart_line WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, line) in (0_i32..).zip(lines) {
            sqlx::query(
                r"
                INSERT INTO shop.cart_line
                    (user_id, position, product_id, name, price, image, description, category, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(user_id)
            .bind(position)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(line.price)
            .bind(&line.image)
            .bind(&line.description)
            .bind(&line.category)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_unique("duplicate product in cart"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove every line from the stored cart of the user with `key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn clear(&self, key: &UserKey) -> Result<(), RepositoryError> {
        self.replace(key, &[]).await
    }
}
