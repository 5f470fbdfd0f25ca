//! Catalog browsing and product creation.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{Discount, Money, Product, Variant};
use crate::events::EventPublisher;
use crate::store::CatalogStore;
use crate::{CommerceError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[validate(length(min = 1, message = "at least one size variant is required"))]
    pub variants: Vec<Variant>,
    pub discount: Option<Discount>,
    pub images: Option<String>,
    pub origin: Option<String>,
    pub category_id: Option<String>,
    pub manufacturer_id: Option<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    currency: String,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, currency: impl Into<String>, events: EventPublisher) -> Self {
        Self { catalog, currency: currency.into(), events }
    }

    /// Page numbers start at 1; `limit` defaults to 6 and is capped at 100.
    pub async fn list(&self, params: ListParams) -> Result<ProductPage> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(limit);
        let (products, total) = self.catalog.list_products(offset, u64::from(limit)).await?;
        Ok(ProductPage { products, current_page: page, total_pages: total.div_ceil(u64::from(limit)), total })
    }

    pub async fn get(&self, product_id: &str) -> Result<Product> {
        self.catalog.find_product(product_id).await?.ok_or(CommerceError::ProductNotFound)
    }

    pub async fn create(&self, input: CreateProductInput) -> Result<Product> {
        input.validate().map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        if input.price <= Decimal::ZERO {
            return Err(CommerceError::InvalidInput("price must be positive".to_string()));
        }
        if input.discount.as_ref().is_some_and(|d| d.discount_percent > 100) {
            return Err(CommerceError::InvalidInput("discountPercent must be at most 100".to_string()));
        }

        let mut product = Product::create(input.name, Money::new(input.price, &self.currency)).with_description(input.description);
        for variant in input.variants {
            product = product.with_variant(variant.size, variant.stock);
        }
        if let Some(discount) = input.discount {
            product = product.with_discount(discount);
        }
        if let Some(images) = input.images {
            product = product.with_images(images);
        }
        if let Some(origin) = input.origin {
            product = product.with_origin(origin);
        }
        if let Some(category_id) = input.category_id {
            product = product.with_category(category_id);
        }
        if let Some(manufacturer_id) = input.manufacturer_id {
            product = product.with_manufacturer(manufacturer_id);
        }

        let events = product.take_events();
        let product = self.catalog.save_product(product).await?;
        self.events.publish(events).await;
        tracing::info!(product_id = product.id(), name = product.name(), "created product");
        Ok(product)
    }
}
