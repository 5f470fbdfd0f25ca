//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, Quantity, Size};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    price: Money,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    manufacturer_id: Option<String>,
    #[serde(default)]
    discount: Option<Discount>,
    #[serde(default)]
    images: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    rating: f32,
    #[serde(default)]
    is_featured: bool,
    #[serde(default)]
    total_sold: u64,
    variants: Vec<Variant>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] pub struct Variant { pub size: Size, pub stock: u32 }
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)] #[serde(rename_all = "camelCase")] pub struct Discount { pub id: String, pub discount_percent: u8 }

impl Product {
    pub fn create(name: impl Into<String>, price: Money) -> Self {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let mut product = Self {
            id: id.clone(), name: name.into(), description: String::new(), price,
            category_id: None, manufacturer_id: None, discount: None, images: None, origin: None,
            rating: 0.0, is_featured: false, total_sold: 0, variants: vec![],
            created_at: now, updated_at: now, version: 0, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id }));
        product
    }

    /// Sets the stock of `size`, replacing any existing variant for that size.
    pub fn with_variant(mut self, size: Size, stock: u32) -> Self {
        match self.variants.iter_mut().find(|v| v.size == size) {
            Some(v) => v.stock = stock,
            None => self.variants.push(Variant { size, stock }),
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }
    pub fn with_discount(mut self, discount: Discount) -> Self { self.discount = Some(discount); self }
    pub fn with_images(mut self, images: impl Into<String>) -> Self { self.images = Some(images.into()); self }
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self { self.category_id = Some(category_id.into()); self }
    pub fn with_manufacturer(mut self, manufacturer_id: impl Into<String>) -> Self { self.manufacturer_id = Some(manufacturer_id.into()); self }
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self { self.origin = Some(origin.into()); self }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn price(&self) -> &Money { &self.price }
    pub fn discount(&self) -> Option<&Discount> { self.discount.as_ref() }
    pub fn images(&self) -> Option<&str> { self.images.as_deref() }
    pub fn origin(&self) -> Option<&str> { self.origin.as_deref() }
    pub fn category_id(&self) -> Option<&str> { self.category_id.as_deref() }
    pub fn manufacturer_id(&self) -> Option<&str> { self.manufacturer_id.as_deref() }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn total_sold(&self) -> u64 { self.total_sold }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn version(&self) -> u64 { self.version }

    /// Unit price after the product's discount, if any.
    pub fn effective_price(&self) -> Money {
        match &self.discount {
            Some(d) => self.price.discounted(d.discount_percent),
            None => self.price.clone(),
        }
    }

    pub fn variant(&self, size: Size) -> Option<&Variant> { self.variants.iter().find(|v| v.size == size) }

    pub fn stock_of(&self, size: Size) -> Result<u32, ProductError> {
        self.variant(size).map(|v| v.stock).ok_or(ProductError::SizeUnavailable(size))
    }

    /// Removes sold units from the `size` variant. Stock never goes below zero.
    pub fn decrement_stock(&mut self, size: Size, qty: Quantity) -> Result<u32, ProductError> {
        let variant = self.variants.iter_mut().find(|v| v.size == size).ok_or(ProductError::SizeUnavailable(size))?;
        if qty.value() > variant.stock {
            return Err(ProductError::InsufficientStock { requested: qty.value(), available: variant.stock });
        }
        variant.stock -= qty.value();
        let remaining = variant.stock;
        self.total_sold += u64::from(qty.value());
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockDecremented {
            product_id: self.id.clone(), size, quantity: qty.value(), remaining,
        }));
        Ok(remaining)
    }

    /// Inverse of [`Product::decrement_stock`].
    pub fn restock(&mut self, size: Size, qty: Quantity) -> Result<u32, ProductError> {
        let variant = self.variants.iter_mut().find(|v| v.size == size).ok_or(ProductError::SizeUnavailable(size))?;
        variant.stock = variant.stock.saturating_add(qty.value());
        let remaining = variant.stock;
        self.total_sold = self.total_sold.saturating_sub(u64::from(qty.value()));
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockRestored {
            product_id: self.id.clone(), size, quantity: qty.value(), remaining,
        }));
        Ok(remaining)
    }

    pub(crate) fn set_version(&mut self, version: u64) { self.version = version; }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { SizeUnavailable(Size), InsufficientStock { requested: u32, available: u32 } }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeUnavailable(size) => write!(f, "size {size} is not available for this product"),
            Self::InsufficientStock { requested, available } => write!(f, "insufficient stock: requested {requested}, available {available}"),
        }
    }
}
