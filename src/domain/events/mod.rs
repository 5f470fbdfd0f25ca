//! Domain events
use crate::domain::value_objects::Size;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: String },
    StockDecremented { product_id: String, size: Size, quantity: u32, remaining: u32 },
    StockRestored { product_id: String, size: Size, quantity: u32, remaining: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { user_id: String, product_id: String, size: Size, quantity: u32 },
    QuantityChanged { user_id: String, product_id: String, size: Size, quantity: u32 },
    ItemRemoved { user_id: String, product_id: String, size: Size },
    Cleared { user_id: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, user_id: String },
    PaymentCompleted { order_id: String },
    PaymentFailed { order_id: String },
}

impl DomainEvent {
    /// Dotted subject the event is published under, e.g. `commerce.cart.item_added`.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Product(e) => ("product", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::StockDecremented { .. } => "stock_decremented",
                ProductEvent::StockRestored { .. } => "stock_restored",
            }),
            Self::Cart(e) => ("cart", match e {
                CartEvent::ItemAdded { .. } => "item_added",
                CartEvent::QuantityChanged { .. } => "quantity_changed",
                CartEvent::ItemRemoved { .. } => "item_removed",
                CartEvent::Cleared { .. } => "cleared",
            }),
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::PaymentCompleted { .. } => "payment_completed",
                OrderEvent::PaymentFailed { .. } => "payment_failed",
            }),
        };
        format!("commerce.{aggregate}.{name}")
    }
}
