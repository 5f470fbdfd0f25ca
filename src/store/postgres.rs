//! Postgres-backed document store.
//!
//! Each collection is a table of JSONB documents with a `version` column.
//! Conditional writes compare the version in the `WHERE` clause, so a lost
//! update shows up as zero affected rows.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::{CartStore, CatalogStore, OrderStore, StoreError, StoreResult};
use crate::domain::{Cart, Order, PaymentStatus, Product};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

fn expect_written(rows: u64) -> StoreResult<()> {
    if rows == 0 { Err(StoreError::Conflict) } else { Ok(()) }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let row: Option<(Json<Product>, i64)> = sqlx::query_as("SELECT doc, version FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(mut product), version)| {
            product.set_version(version as u64);
            product
        }))
    }

    async fn list_products(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Product>, u64)> {
        let rows: Vec<(Json<Product>, i64)> =
            sqlx::query_as("SELECT doc, version FROM products ORDER BY (doc->>'createdAt')::timestamptz DESC, id DESC LIMIT $1 OFFSET $2")
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        let products = rows
            .into_iter()
            .map(|(Json(mut product), version)| {
                product.set_version(version as u64);
                product
            })
            .collect();
        Ok((products, total.0 as u64))
    }

    async fn save_product(&self, mut product: Product) -> StoreResult<Product> {
        let expected = product.version() as i64;
        let result = if expected == 0 {
            sqlx::query("INSERT INTO products (id, doc, version) VALUES ($1, $2, 1) ON CONFLICT (id) DO NOTHING")
                .bind(product.id())
                .bind(Json(&product))
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE products SET doc = $2, version = version + 1 WHERE id = $1 AND version = $3")
                .bind(product.id())
                .bind(Json(&product))
                .bind(expected)
                .execute(&self.pool)
                .await?
        };
        expect_written(result.rows_affected())?;
        product.set_version(expected as u64 + 1);
        Ok(product)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart(&self, user_id: &str) -> StoreResult<Option<Cart>> {
        let row: Option<(Json<Cart>, i64)> = sqlx::query_as("SELECT doc, version FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(mut cart), version)| {
            cart.set_version(version as u64);
            cart
        }))
    }

    async fn save_cart(&self, mut cart: Cart) -> StoreResult<Cart> {
        let expected = cart.version() as i64;
        let result = if expected == 0 {
            sqlx::query("INSERT INTO carts (user_id, doc, version) VALUES ($1, $2, 1) ON CONFLICT (user_id) DO NOTHING")
                .bind(cart.user_id())
                .bind(Json(&cart))
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE carts SET doc = $2, version = version + 1 WHERE user_id = $1 AND version = $3")
                .bind(cart.user_id())
                .bind(Json(&cart))
                .bind(expected)
                .execute(&self.pool)
                .await?
        };
        expect_written(result.rows_affected())?;
        cart.set_version(expected as u64 + 1);
        Ok(cart)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT doc FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        let result = sqlx::query("INSERT INTO orders (id, user_id, doc) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING")
            .bind(order.id())
            .bind(order.user_id())
            .bind(Json(&order))
            .execute(&self.pool)
            .await?;
        expect_written(result.rows_affected())?;
        Ok(order)
    }

    async fn settle_payment(&self, id: &str, status: PaymentStatus) -> StoreResult<Option<Order>> {
        let now = Utc::now();
        let row: Option<(Json<Order>,)> = sqlx::query_as(
            "UPDATE orders SET doc = jsonb_set(jsonb_set(jsonb_set(doc, '{paymentStatus}', $2), '{paymentDate}', $3), '{updatedAt}', $3) \
             WHERE id = $1 AND doc->>'paymentStatus' = 'Pending' RETURNING doc",
        )
        .bind(id)
        .bind(Json(status))
        .bind(Json(now))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn delete_pending_order(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND doc->>'paymentStatus' = 'Pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
