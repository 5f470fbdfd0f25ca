//! Checkout Reconciliation Service.
//!
//! Turns an authenticated gateway callback into order, stock and cart
//! updates. Stock is decremented with one conditional write per product,
//! issued concurrently; there is no cross-product atomicity, so the outcome of
//! every line is collected in a [`StockBatch`] and [`StockFailurePolicy`]
//! decides what happens when some lines fail.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use super::retry_on_conflict;
use crate::config::PaymentConfig;
use crate::domain::{DomainEvent, LineItem, Order, OrderEvent, PaymentStatus, Quantity, Size};
use crate::events::EventPublisher;
use crate::payment::{self, GatewayReturn, PaymentRequest};
use crate::store::{CartStore, CatalogStore, OrderStore};
use crate::{CommerceError, Result};

/// What to do with already-applied decrements when other lines of the same
/// batch fail. In both cases the cart is kept so the buyer's lines are not lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StockFailurePolicy {
    /// Leave applied decrements in place.
    #[default]
    Retain,
    /// Restore every applied decrement.
    Rollback,
}

impl FromStr for StockFailurePolicy {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "rollback" => Ok(Self::Rollback),
            other => Err(format!("expected 'retain' or 'rollback', got '{other}'")),
        }
    }
}

/// Result of decrementing stock for one cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLineOutcome {
    pub product_id: String,
    pub size: Size,
    pub quantity: Quantity,
    /// Remaining stock on success, the error message otherwise.
    pub result: std::result::Result<u32, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockBatch {
    pub lines: Vec<StockLineOutcome>,
}

impl StockBatch {
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|l| l.result.is_ok())
    }

    pub fn applied(&self) -> impl Iterator<Item = &StockLineOutcome> {
        self.lines.iter().filter(|l| l.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StockLineOutcome> {
        self.lines.iter().filter(|l| l.result.is_err())
    }

    fn failure_summary(&self) -> String {
        self.failed()
            .map(|l| format!("{} ({}): {}", l.product_id, l.size, l.result.as_ref().err().map(String::as_str).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Payment accepted. `order` is `None` when the reference matched no order,
    /// `stock` is `None` when there was no cart to settle.
    Completed { order: Option<Order>, stock: Option<StockBatch> },
    /// Payment declined; the order was deleted if it existed.
    Failed { order_id: String, deleted: bool },
    /// The order's payment was settled by an earlier callback; nothing changed.
    AlreadySettled { order: Order },
}

#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
    payment: PaymentConfig,
    policy: StockFailurePolicy,
    events: EventPublisher,
}

#[derive(Clone, Copy)]
enum Adjustment {
    Decrement,
    Restock,
}

/// Groups lines by product, keeping first-seen order.
fn group_by_product<'a>(lines: impl Iterator<Item = (&'a str, Size, Quantity)>) -> Vec<(&'a str, Vec<(Size, Quantity)>)> {
    let mut groups: Vec<(&str, Vec<(Size, Quantity)>)> = Vec::new();
    for (product_id, size, quantity) in lines {
        match groups.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, sizes)) => sizes.push((size, quantity)),
            None => groups.push((product_id, vec![(size, quantity)])),
        }
    }
    groups
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
        payment: PaymentConfig,
        policy: StockFailurePolicy,
        events: EventPublisher,
    ) -> Self {
        Self { catalog, carts, orders, payment, policy, events }
    }

    /// Signed gateway URL for one of the user's pending orders.
    pub async fn payment_url(&self, user_id: &str, order_id: &str, ip_addr: &str, locale: Option<String>, bank_code: Option<String>) -> Result<String> {
        let order = self
            .orders
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id() == user_id)
            .ok_or(CommerceError::OrderNotFound)?;
        if order.payment_status() != PaymentStatus::Pending {
            return Err(CommerceError::InvalidInput(format!("order {order_id} is not awaiting payment")));
        }
        let request = PaymentRequest {
            order_id: order.id().to_string(),
            amount: order.total_amount().clone(),
            ip_addr: ip_addr.to_string(),
            locale,
            bank_code,
            created_at: Utc::now(),
        };
        tracing::info!(user_id, order_id, amount = %order.total_amount().amount(), "redirecting to payment gateway");
        Ok(payment::build_payment_url(&self.payment, &request))
    }

    /// Applies a gateway callback. Nothing is mutated unless the signature checks
    /// out, and only an order still awaiting payment is settled or deleted.
    pub async fn reconcile(&self, params: &HashMap<String, String>) -> Result<CheckoutOutcome> {
        let gateway = GatewayReturn::verify(&self.payment, params).map_err(|e| {
            tracing::warn!(error = %e, "rejected payment callback");
            e
        })?;
        let order_id = gateway.txn_ref.as_str();

        match gateway.payment_status() {
            PaymentStatus::Completed => self.complete(order_id).await,
            _ => self.cancel(order_id, &gateway.response_code).await,
        }
    }

    async fn complete(&self, order_id: &str) -> Result<CheckoutOutcome> {
        let Some(order) = self.orders.settle_payment(order_id, PaymentStatus::Completed).await? else {
            if let Some(order) = self.settled_order(order_id).await? {
                return Ok(CheckoutOutcome::AlreadySettled { order });
            }
            tracing::warn!(order_id, "payment completed for unknown order");
            return Ok(CheckoutOutcome::Completed { order: None, stock: None });
        };
        tracing::info!(order_id, user_id = order.user_id(), "payment completed");
        self.events.publish(vec![DomainEvent::Order(OrderEvent::PaymentCompleted { order_id: order_id.to_string() })]).await;

        let Some(cart) = self.carts.find_cart(order.user_id()).await? else {
            return Ok(CheckoutOutcome::Completed { order: Some(order), stock: None });
        };

        let batch = self.decrement_all(cart.items()).await;
        if !batch.is_complete() {
            tracing::error!(order_id, failures = %batch.failure_summary(), policy = ?self.policy, "stock update incomplete, cart kept");
            if self.policy == StockFailurePolicy::Rollback {
                self.roll_back(&batch).await;
            }
            return Err(CommerceError::StockUpdate(batch.failure_summary()));
        }

        self.clear_cart(order.user_id()).await?;
        Ok(CheckoutOutcome::Completed { order: Some(order), stock: Some(batch) })
    }

    async fn cancel(&self, order_id: &str, response_code: &str) -> Result<CheckoutOutcome> {
        let deleted = self.orders.delete_pending_order(order_id).await?;
        if !deleted {
            if let Some(order) = self.settled_order(order_id).await? {
                return Ok(CheckoutOutcome::AlreadySettled { order });
            }
        }
        tracing::info!(order_id, response_code, deleted, "payment failed");
        self.events.publish(vec![DomainEvent::Order(OrderEvent::PaymentFailed { order_id: order_id.to_string() })]).await;
        Ok(CheckoutOutcome::Failed { order_id: order_id.to_string(), deleted })
    }

    /// The order behind a callback that could not transition it, if it exists.
    async fn settled_order(&self, order_id: &str) -> Result<Option<Order>> {
        let order = self.orders.find_order(order_id).await?;
        if let Some(order) = &order {
            tracing::warn!(order_id, payment_status = ?order.payment_status(), "callback for settled order ignored");
        }
        Ok(order)
    }

    async fn decrement_all(&self, items: &[LineItem]) -> StockBatch {
        let lines = items.iter().map(|i| (i.product_id.as_str(), i.size, i.quantity));
        self.adjust_all(lines, Adjustment::Decrement).await
    }

    async fn roll_back(&self, batch: &StockBatch) {
        let lines = batch.applied().map(|l| (l.product_id.as_str(), l.size, l.quantity));
        let restored = self.adjust_all(lines, Adjustment::Restock).await;
        for line in restored.failed() {
            tracing::error!(product_id = %line.product_id, size = %line.size, error = ?line.result, "failed to restore stock");
        }
    }

    /// Adjusts every line, with one read-modify-write per product running
    /// concurrently. Lines of the same product never race each other.
    async fn adjust_all<'a>(&self, lines: impl Iterator<Item = (&'a str, Size, Quantity)>, adjustment: Adjustment) -> StockBatch {
        let updates = group_by_product(lines).into_iter().map(|(product_id, sizes)| async move {
            let results = match self.adjust(product_id, &sizes, adjustment).await {
                Ok(results) => results,
                Err(e) => vec![Err(e.to_string()); sizes.len()],
            };
            sizes
                .into_iter()
                .zip(results)
                .map(|((size, quantity), result)| StockLineOutcome { product_id: product_id.to_string(), size, quantity, result })
                .collect::<Vec<_>>()
        });
        StockBatch { lines: join_all(updates).await.into_iter().flatten().collect() }
    }

    /// Conditional read-modify-write of one product, applying each size in turn.
    /// A size that cannot be adjusted fails alone; the others are still written.
    async fn adjust(
        &self,
        product_id: &str,
        sizes: &[(Size, Quantity)],
        adjustment: Adjustment,
    ) -> Result<Vec<std::result::Result<u32, String>>> {
        retry_on_conflict("stock.adjust", move || async move {
            let mut product = self.catalog.find_product(product_id).await?.ok_or(CommerceError::ProductNotFound)?;
            let results: Vec<_> = sizes
                .iter()
                .map(|&(size, quantity)| {
                    let remaining = match adjustment {
                        Adjustment::Decrement => product.decrement_stock(size, quantity),
                        Adjustment::Restock => product.restock(size, quantity),
                    };
                    remaining.map_err(|e| CommerceError::from(e).to_string())
                })
                .collect();
            if results.iter().any(|r| r.is_ok()) {
                let events = product.take_events();
                self.catalog.save_product(product).await?;
                self.events.publish(events).await;
            }
            Ok(results)
        })
        .await
    }

    async fn clear_cart(&self, user_id: &str) -> Result<()> {
        retry_on_conflict("checkout.clear_cart", move || async move {
            let Some(mut cart) = self.carts.find_cart(user_id).await? else {
                return Ok(());
            };
            cart.clear();
            let events = cart.take_events();
            self.carts.save_cart(cart).await?;
            self.events.publish(events).await;
            Ok(())
        })
        .await
    }
}
