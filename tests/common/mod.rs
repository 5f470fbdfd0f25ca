#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rust_decimal::Decimal;

use fashion_commerce::config::AppConfig;
use fashion_commerce::domain::{Cart, Money, Order, PaymentStatus, Product, Size};
use fashion_commerce::events::EventPublisher;
use fashion_commerce::http::auth::Claims;
use fashion_commerce::http::AppState;
use fashion_commerce::payment::signature;
use fashion_commerce::services::StockFailurePolicy;
use fashion_commerce::store::{CartStore, CatalogStore, InMemoryStore, OrderStore, StoreError, StoreResult, Stores};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const HASH_SECRET: &str = "test-hash-secret";

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    /// Set when the services run against a [`YieldingStore`].
    pub yielding: Option<Arc<YieldingStore>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(StockFailurePolicy::Retain)
    }

    pub fn with_policy(policy: StockFailurePolicy) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(Stores::shared(store.clone()), &config(policy), EventPublisher::disabled());
        Self { store, state, yielding: None }
    }

    /// Services see a store that suspends between every read and the write
    /// that follows, so concurrent tasks really interleave.
    pub fn yielding() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let yielding = Arc::new(YieldingStore::new(store.clone()));
        let state = AppState::new(Stores::shared(yielding.clone()), &config(StockFailurePolicy::Retain), EventPublisher::disabled());
        Self { store, state, yielding: Some(yielding) }
    }

    /// Conditional writes rejected so far; always 0 without a yielding store.
    pub fn conflicts(&self) -> usize {
        self.yielding.as_ref().map(|y| y.conflicts()).unwrap_or(0)
    }

    pub async fn seed_product(&self, name: &str, price: i64, stock: &[(Size, u32)]) -> Product {
        let product = stock
            .iter()
            .fold(Product::create(name, Money::vnd(Decimal::new(price, 0))), |p, (size, n)| p.with_variant(*size, *n));
        self.store.save_product(product).await.unwrap()
    }

    pub async fn product(&self, id: &str) -> Product {
        self.store.find_product(id).await.unwrap().unwrap()
    }
}

pub fn config(policy: StockFailurePolicy) -> AppConfig {
    let policy = match policy {
        StockFailurePolicy::Retain => "retain",
        StockFailurePolicy::Rollback => "rollback",
    };
    let vars: HashMap<&str, &str> = [
        ("JWT_SECRET", JWT_SECRET),
        ("VNP_TMN_CODE", "TESTTMN"),
        ("VNP_HASH_SECRET", HASH_SECRET),
        ("STOCK_FAILURE_POLICY", policy),
    ]
    .into_iter()
    .collect();
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

/// Callback parameters as the gateway would send them, signed with the test secret.
pub fn signed_return(order_id: &str, response_code: &str) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = [
        ("vnp_Amount", "30000000"),
        ("vnp_BankCode", "NCB"),
        ("vnp_OrderInfo", "Thanh toán đơn hàng"),
        ("vnp_PayDate", "20240501120000"),
        ("vnp_ResponseCode", response_code),
        ("vnp_TmnCode", "TESTTMN"),
        ("vnp_TransactionNo", "14000001"),
        ("vnp_TxnRef", order_id),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let hash = signature::sign(HASH_SECRET, &signature::sign_data(&signature::canonicalize(&params)));
    params.insert(signature::SECURE_HASH.to_string(), hash);
    params
}

pub fn mint_jwt(user_id: &str) -> String {
    let claims = Claims { sub: user_id.to_string(), exp: (Utc::now() + Duration::minutes(10)).timestamp() as usize };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("failed to encode jwt")
}

/// Delegates to an [`InMemoryStore`], yielding to the scheduler after each
/// read and counting writes rejected with [`StoreError::Conflict`].
pub struct YieldingStore {
    inner: Arc<InMemoryStore>,
    conflicts: AtomicUsize,
}

impl YieldingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self { inner, conflicts: AtomicUsize::new(0) }
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn count<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        if matches!(result, Err(StoreError::Conflict)) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl CatalogStore for YieldingStore {
    async fn find_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = self.inner.find_product(id).await;
        tokio::task::yield_now().await;
        product
    }

    async fn list_products(&self, offset: u64, limit: u64) -> StoreResult<(Vec<Product>, u64)> {
        self.inner.list_products(offset, limit).await
    }

    async fn save_product(&self, product: Product) -> StoreResult<Product> {
        self.count(self.inner.save_product(product).await)
    }
}

#[async_trait]
impl CartStore for YieldingStore {
    async fn find_cart(&self, user_id: &str) -> StoreResult<Option<Cart>> {
        let cart = self.inner.find_cart(user_id).await;
        tokio::task::yield_now().await;
        cart
    }

    async fn save_cart(&self, cart: Cart) -> StoreResult<Cart> {
        self.count(self.inner.save_cart(cart).await)
    }
}

#[async_trait]
impl OrderStore for YieldingStore {
    async fn find_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let order = self.inner.find_order(id).await;
        tokio::task::yield_now().await;
        order
    }

    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        self.inner.insert_order(order).await
    }

    async fn settle_payment(&self, id: &str, status: PaymentStatus) -> StoreResult<Option<Order>> {
        self.inner.settle_payment(id, status).await
    }

    async fn delete_pending_order(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_pending_order(id).await
    }
}
