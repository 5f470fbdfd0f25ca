//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, Quantity, Size};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    user_id: String,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    address: String,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] #[serde(rename_all = "camelCase")] pub struct OrderItem { pub product_id: String, pub size: Size, pub quantity: Quantity, pub price: Money }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] pub enum OrderStatus { #[default] Pending, Shipped, Delivered, Canceled }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] pub enum PaymentMethod { #[default] #[serde(rename = "COD")] Cod, Online }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] pub enum PaymentStatus { #[default] Pending, Completed, Failed }

impl Order {
    pub fn place(user_id: impl Into<String>, address: impl Into<String>, payment_method: PaymentMethod, currency: &str) -> Self {
        let id = Uuid::now_v7().to_string();
        let user_id = user_id.into();
        let now = Utc::now();
        let mut order = Self {
            id: id.clone(), user_id: user_id.clone(), items: vec![], total_amount: Money::zero(currency),
            status: OrderStatus::Pending, address: address.into(), payment_method,
            payment_status: PaymentStatus::Pending, payment_date: now, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, user_id }));
        order
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn address(&self) -> &str { &self.address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }

    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        let line_total = item.price.multiply(item.quantity.value());
        self.total_amount = self.total_amount.add(&line_total).map_err(|_| OrderError::CurrencyMismatch)?;
        self.items.push(item);
        self.touch();
        Ok(())
    }

    /// Records the gateway's verdict on this order's payment.
    pub fn record_payment(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.payment_date = Utc::now();
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { CurrencyMismatch }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "order items must share one currency") }
}
