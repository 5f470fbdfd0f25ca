use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{CartStore, CatalogStore, OrderStore, StoreError, StoreResult};
use crate::domain::{Cart, Order, PaymentStatus, Product};

#[derive(Debug, Clone)]
struct Document {
    body: Value,
    version: u64,
}

type Collection = RwLock<HashMap<String, Document>>;

/// In-memory document store.
///
/// Documents are kept as JSON so loads behave like a real document database:
/// every read decodes a fresh copy and transient state (pending events) is dropped.
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    products: Collection,
    carts: Collection,
    orders: Collection,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn load<T: serde::de::DeserializeOwned>(collection: &Collection, key: &str) -> StoreResult<Option<(T, u64)>> {
        let docs = collection.read().map_err(|_| poisoned())?;
        let Some(doc) = docs.get(key) else {
            return Ok(None);
        };
        let value = serde_json::from_value(doc.body.clone())?;
        Ok(Some((value, doc.version)))
    }

    /// Writes `body` under `key` if the stored version equals `expected` (0 = absent).
    fn store_versioned(collection: &Collection, key: &str, body: Value, expected: u64) -> StoreResult<u64> {
        let mut docs = collection.write().map_err(|_| poisoned())?;
        let current = docs.get(key).map(|d| d.version).unwrap_or(0);
        if current != expected {
            return Err(StoreError::Conflict);
        }
        let version = expected + 1;
        docs.insert(key.to_string(), Document { body, version });
        Ok(version)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(Self::load::<Product>(&self.products, id)?.map(|(mut p, version)| {
            p.set_version(version);
            p
        }))
    }

    async fn list_products(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Product>, u64)> {
        let mut products = {
            let docs = self.products.read().map_err(|_| poisoned())?;
            docs.values()
                .map(|doc| {
                    let mut product: Product = serde_json::from_value(doc.body.clone())?;
                    product.set_version(doc.version);
                    Ok(product)
                })
                .collect::<StoreResult<Vec<_>>>()?
        };
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(a.id())));
        let total = products.len() as u64;
        let page = products.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((page, total))
    }

    async fn save_product(&self, mut product: Product) -> StoreResult<Product> {
        let body = serde_json::to_value(&product)?;
        let version = Self::store_versioned(&self.products, product.id(), body, product.version())?;
        product.set_version(version);
        Ok(product)
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart(&self, user_id: &str) -> StoreResult<Option<Cart>> {
        Ok(Self::load::<Cart>(&self.carts, user_id)?.map(|(mut c, version)| {
            c.set_version(version);
            c
        }))
    }

    async fn save_cart(&self, mut cart: Cart) -> StoreResult<Cart> {
        let body = serde_json::to_value(&cart)?;
        let version = Self::store_versioned(&self.carts, cart.user_id(), body, cart.version())?;
        cart.set_version(version);
        Ok(cart)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(Self::load::<Order>(&self.orders, id)?.map(|(o, _)| o))
    }

    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        let body = serde_json::to_value(&order)?;
        Self::store_versioned(&self.orders, order.id(), body, 0)?;
        Ok(order)
    }

    async fn settle_payment(&self, id: &str, status: PaymentStatus) -> StoreResult<Option<Order>> {
        let mut docs = self.orders.write().map_err(|_| poisoned())?;
        let Some(doc) = docs.get_mut(id) else {
            return Ok(None);
        };
        let mut order: Order = serde_json::from_value(doc.body.clone())?;
        if order.payment_status() != PaymentStatus::Pending {
            return Ok(None);
        }
        order.record_payment(status);
        doc.body = serde_json::to_value(&order)?;
        doc.version += 1;
        Ok(Some(order))
    }

    async fn delete_pending_order(&self, id: &str) -> StoreResult<bool> {
        let mut docs = self.orders.write().map_err(|_| poisoned())?;
        let Some(doc) = docs.get(id) else {
            return Ok(false);
        };
        let order: Order = serde_json::from_value(doc.body.clone())?;
        if order.payment_status() != PaymentStatus::Pending {
            return Ok(false);
        }
        Ok(docs.remove(id).is_some())
    }
}
