use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use validator::Validate;

use crate::domain::{Order, OrderItem, PaymentMethod};
use crate::events::EventPublisher;
use crate::store::{CartStore, CatalogStore, OrderStore};
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderInput {
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// Turns the current cart into a pending order.
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
    currency: String,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
        currency: impl Into<String>,
        events: EventPublisher,
    ) -> Self {
        Self { catalog, carts, orders, currency: currency.into(), events }
    }

    /// Prices each cart line at the product's discounted price. Stock is only
    /// checked here; it is decremented once the payment is confirmed.
    pub async fn place(&self, user_id: &str, input: PlaceOrderInput) -> Result<Order> {
        input.validate().map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        let address = input.address.ok_or_else(|| CommerceError::InvalidInput("Address is required".to_string()))?;
        let payment_method = input.payment_method.unwrap_or_default();

        let cart = self.carts.find_cart(user_id).await?.ok_or(CommerceError::CartNotFound)?;
        if cart.is_empty() {
            return Err(CommerceError::InvalidInput("Cart is empty".to_string()));
        }

        let lookups = cart.items().iter().map(|item| self.catalog.find_product(&item.product_id));
        let products = join_all(lookups).await;

        let mut order = Order::place(user_id, address, payment_method, &self.currency);
        for (item, product) in cart.items().iter().zip(products) {
            let product = product?.ok_or(CommerceError::ProductNotFound)?;
            let available = product.stock_of(item.size)?;
            if item.quantity.value() > available {
                return Err(CommerceError::InsufficientStock { requested: item.quantity.value(), available });
            }
            order
                .add_item(OrderItem {
                    product_id: item.product_id.clone(),
                    size: item.size,
                    quantity: item.quantity,
                    price: product.effective_price(),
                })
                .map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        }

        let events = order.take_events();
        let order = self.orders.insert_order(order).await?;
        self.events.publish(events).await;
        tracing::info!(user_id, order_id = order.id(), total = %order.total_amount().amount(), "order placed");
        Ok(order)
    }

    /// Orders belonging to someone else are reported as not found.
    pub async fn get(&self, user_id: &str, order_id: &str) -> Result<Order> {
        self.orders
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id() == user_id)
            .ok_or(CommerceError::OrderNotFound)
    }
}
