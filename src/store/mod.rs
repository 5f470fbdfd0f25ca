//! Document stores backing the catalog, carts and orders.
//!
//! Every document carries a version. Writes of products and carts are
//! conditional on the version the caller read; a mismatch is reported as
//! [`StoreError::Conflict`] and nothing is written. Order payment updates are
//! single-document writes that only apply while the payment is pending.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Cart, Order, PaymentStatus, Product};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document was modified concurrently")]
    Conflict,

    #[error("{0}")]
    Backend(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self { Self::Backend(e.to_string()) }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self { Self::Corrupt(e.to_string()) }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>>;

    /// One page of the catalog, newest first, with the total product count.
    async fn list_products(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Product>, u64)>;

    /// Persists `product`. Version 0 inserts a new document; any other version
    /// must match the stored one. Returns the product at its new version.
    async fn save_product(&self, product: Product) -> StoreResult<Product>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, user_id: &str) -> StoreResult<Option<Cart>>;

    /// Same versioning contract as [`CatalogStore::save_product`], keyed by user.
    async fn save_cart(&self, cart: Cart) -> StoreResult<Cart>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>>;

    async fn insert_order(&self, order: Order) -> StoreResult<Order>;

    /// Moves a pending order to `status` in place and returns it. `None` when
    /// no order has that id or its payment is no longer pending.
    async fn settle_payment(&self, id: &str, status: PaymentStatus) -> StoreResult<Option<Order>>;

    /// Deletes the order if its payment is still pending. Returns whether a
    /// document was deleted.
    async fn delete_pending_order(&self, id: &str) -> StoreResult<bool>;
}

/// The three collections the services work against.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Uses one backend for all three collections.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore + CartStore + OrderStore + 'static,
    {
        Self { catalog: store.clone(), carts: store.clone(), orders: store }
    }
}
