//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Quantity, Size};

/// One cart per user. Holds at most one line item per (product, size) pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: String,
    #[serde(rename = "products")]
    items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub size: Size,
    pub quantity: Quantity,
}

impl LineItem {
    fn is(&self, product_id: &str, size: Size) -> bool { self.product_id == product_id && self.size == size }
}

impl Cart {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { user_id: user_id.into(), items: vec![], created_at: now, updated_at: now, version: 0, events: vec![] }
    }

    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn item(&self, product_id: &str, size: Size) -> Option<&LineItem> { self.items.iter().find(|i| i.is(product_id, size)) }
    /// Number of distinct line items, not summed quantities.
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn version(&self) -> u64 { self.version }

    /// Adds `quantity` of `product_id`/`size`, merging into an existing line.
    /// `stock` is the variant stock the caller validated against; the merged
    /// total must not exceed it. The cart is left untouched on error.
    pub fn add_item(&mut self, product_id: &str, size: Size, quantity: Quantity, stock: u32) -> Result<&LineItem, CartError> {
        if quantity.value() > stock {
            return Err(CartError::ExceedsStock { requested: quantity.value(), available: stock });
        }
        let index = match self.items.iter().position(|i| i.is(product_id, size)) {
            Some(index) => {
                let merged = self.items[index].quantity.checked_add(quantity)
                    .filter(|q| q.value() <= stock)
                    .ok_or(CartError::ExceedsStock {
                        requested: self.items[index].quantity.value().saturating_add(quantity.value()),
                        available: stock,
                    })?;
                self.items[index].quantity = merged;
                index
            }
            None => {
                self.items.push(LineItem { product_id: product_id.to_string(), size, quantity });
                self.items.len() - 1
            }
        };
        self.touch();
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded {
            user_id: self.user_id.clone(), product_id: product_id.to_string(), size, quantity: quantity.value(),
        }));
        Ok(&self.items[index])
    }

    /// Overwrites the quantity of an existing line.
    pub fn set_quantity(&mut self, product_id: &str, size: Size, quantity: Quantity) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.is(product_id, size)).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.touch();
        self.raise_event(DomainEvent::Cart(CartEvent::QuantityChanged {
            user_id: self.user_id.clone(), product_id: product_id.to_string(), size, quantity: quantity.value(),
        }));
        Ok(())
    }

    /// Removes the matching line. Returns `false` when there was nothing to remove.
    pub fn remove_item(&mut self, product_id: &str, size: Size) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.is(product_id, size));
        if self.items.len() == before { return false; }
        self.touch();
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved {
            user_id: self.user_id.clone(), product_id: product_id.to_string(), size,
        }));
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared { user_id: self.user_id.clone() }));
    }

    pub(crate) fn set_version(&mut self, version: u64) { self.version = version; }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, ExceedsStock { requested: u32, available: u32 } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found in cart"),
            Self::ExceedsStock { requested, available } => write!(f, "requested {requested} exceeds stock of {available}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: u32) -> Quantity { Quantity::new(n).unwrap() }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::for_user("U1");
        cart.add_item("P1", Size::M, qty(2), 10).unwrap();
        assert_eq!(cart.item_count(), 1);
        cart.add_item("P1", Size::M, qty(1), 10).unwrap();
        assert_eq!(cart.items()[0].quantity, qty(3)); // Merged
        cart.add_item("P1", Size::L, qty(1), 10).unwrap();
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_merge_over_stock_leaves_cart_unchanged() {
        let mut cart = Cart::for_user("U1");
        cart.add_item("P1", Size::M, qty(6), 10).unwrap();
        let err = cart.add_item("P1", Size::M, qty(5), 10).unwrap_err();
        assert_eq!(err, CartError::ExceedsStock { requested: 11, available: 10 });
        assert_eq!(cart.item("P1", Size::M).unwrap().quantity, qty(6));
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::for_user("U1");
        assert_eq!(cart.set_quantity("P1", Size::S, qty(1)), Err(CartError::ItemNotFound));
        cart.add_item("P1", Size::S, qty(1), 5).unwrap();
        cart.set_quantity("P1", Size::S, qty(4)).unwrap();
        assert_eq!(cart.items()[0].quantity, qty(4));
        assert!(!cart.remove_item("P1", Size::XL));
        assert!(cart.remove_item("P1", Size::S));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_records_event() {
        let mut cart = Cart::for_user("U1");
        cart.add_item("P1", Size::S, qty(1), 5).unwrap();
        cart.take_events();
        cart.clear();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.take_events(), vec![DomainEvent::Cart(CartEvent::Cleared { user_id: "U1".into() })]);
    }
}
