//! Cart Service: mutates a user's cart against current product stock.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::retry_on_conflict;
use crate::domain::{Cart, Discount, Money, Quantity, Size};
use crate::events::EventPublisher;
use crate::store::{CartStore, CatalogStore};
use crate::{CommerceError, Result};

/// Body of add/update requests. Every field is optional on the wire so a
/// missing field is reported as invalid input rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    #[validate(length(min = 1, message = "productId must not be empty"))]
    pub product_id: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i64>,
    pub size: Option<String>,
}

impl CartItemInput {
    pub fn new(product_id: impl Into<String>, size: Size, quantity: u32) -> Self {
        Self { product_id: Some(product_id.into()), quantity: Some(i64::from(quantity)), size: Some(size.to_string()) }
    }

    fn parse(self) -> Result<(String, Size, Quantity)> {
        self.validate().map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        let (Some(product_id), Some(quantity), Some(size)) = (self.product_id, self.quantity, self.size) else {
            return Err(CommerceError::InvalidInput("Product ID, quantity, and size are required".to_string()));
        };
        let quantity = u32::try_from(quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| CommerceError::InvalidInput(format!("invalid quantity {quantity}")))?;
        let size = size.parse::<Size>().map_err(|e| CommerceError::InvalidInput(e.to_string()))?;
        Ok((product_id, size, quantity))
    }
}

/// Product fields shown next to each cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub images: Option<String>,
    pub discount: Option<Discount>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: String,
    /// `None` when the product has since been removed from the catalog.
    pub product: Option<ProductSummary>,
    pub quantity: u32,
    pub size: Size,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: String,
    pub products: Vec<CartLineView>,
}

#[derive(Clone)]
pub struct CartService {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
    events: EventPublisher,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogStore>, carts: Arc<dyn CartStore>, events: EventPublisher) -> Self {
        Self { catalog, carts, events }
    }

    /// The user's cart with each line expanded to product details.
    pub async fn get(&self, user_id: &str) -> Result<CartView> {
        let cart = self.carts.find_cart(user_id).await?.ok_or(CommerceError::CartNotFound)?;
        let lookups = cart.items().iter().map(|item| self.catalog.find_product(&item.product_id));
        let products = join_all(lookups).await;

        let mut lines = Vec::with_capacity(cart.item_count());
        for (item, product) in cart.items().iter().zip(products) {
            let product = product?.map(|p| ProductSummary {
                id: p.id().to_string(),
                name: p.name().to_string(),
                price: p.price().clone(),
                images: p.images().map(str::to_string),
                discount: p.discount().cloned(),
                origin: p.origin().map(str::to_string),
            });
            lines.push(CartLineView {
                product_id: item.product_id.clone(),
                product,
                quantity: item.quantity.value(),
                size: item.size,
            });
        }
        Ok(CartView { user_id: cart.user_id().to_string(), products: lines })
    }

    /// Adds to the cart, creating it on first use. Repeated (product, size)
    /// pairs merge, and the merged total is checked against the stock read at
    /// the start of the attempt.
    pub async fn add(&self, user_id: &str, input: CartItemInput) -> Result<Cart> {
        let (product_id, size, quantity) = input.parse()?;
        let product_id = product_id.as_str();
        retry_on_conflict("cart.add", move || self.try_add(user_id, product_id, size, quantity)).await
    }

    async fn try_add(&self, user_id: &str, product_id: &str, size: Size, quantity: Quantity) -> Result<Cart> {
        let stock = self.checked_stock(product_id, size, quantity).await?;
        let mut cart = match self.carts.find_cart(user_id).await? {
            Some(cart) => cart,
            None => Cart::for_user(user_id),
        };
        cart.add_item(product_id, size, quantity, stock)?;
        let cart = self.persist(cart).await?;
        tracing::info!(user_id, product_id, %size, quantity = quantity.value(), "added to cart");
        Ok(cart)
    }

    /// Overwrites the quantity of an existing line after re-checking stock.
    pub async fn update(&self, user_id: &str, input: CartItemInput) -> Result<Cart> {
        let (product_id, size, quantity) = input.parse()?;
        let product_id = product_id.as_str();
        retry_on_conflict("cart.update", move || self.try_update(user_id, product_id, size, quantity)).await
    }

    async fn try_update(&self, user_id: &str, product_id: &str, size: Size, quantity: Quantity) -> Result<Cart> {
        self.checked_stock(product_id, size, quantity).await?;
        let mut cart = self.carts.find_cart(user_id).await?.ok_or(CommerceError::CartNotFound)?;
        cart.set_quantity(product_id, size, quantity)?;
        let cart = self.persist(cart).await?;
        tracing::info!(user_id, product_id, %size, quantity = quantity.value(), "updated cart line");
        Ok(cart)
    }

    /// Drops the matching line. Removing a line that is not there returns the cart unchanged.
    pub async fn remove(&self, user_id: &str, product_id: &str, size: Size) -> Result<Cart> {
        retry_on_conflict("cart.remove", move || async move {
            let mut cart = self.carts.find_cart(user_id).await?.ok_or(CommerceError::CartNotFound)?;
            if !cart.remove_item(product_id, size) {
                return Ok(cart);
            }
            let cart = self.persist(cart).await?;
            tracing::info!(user_id, product_id, %size, "removed from cart");
            Ok(cart)
        })
        .await
    }

    /// Empties the cart but keeps the document.
    pub async fn clear(&self, user_id: &str) -> Result<Cart> {
        retry_on_conflict("cart.clear", move || async move {
            let mut cart = self.carts.find_cart(user_id).await?.ok_or(CommerceError::CartNotFound)?;
            cart.clear();
            let cart = self.persist(cart).await?;
            tracing::info!(user_id, "cleared cart");
            Ok(cart)
        })
        .await
    }

    /// Distinct lines in the cart; 0 when the user has no cart yet.
    pub async fn count(&self, user_id: &str) -> Result<usize> {
        Ok(self.carts.find_cart(user_id).await?.map(|c| c.item_count()).unwrap_or(0))
    }

    /// Stock of the requested variant, failing when it cannot cover `quantity`.
    async fn checked_stock(&self, product_id: &str, size: Size, quantity: Quantity) -> Result<u32> {
        let product = self.catalog.find_product(product_id).await?.ok_or(CommerceError::ProductNotFound)?;
        let stock = product.stock_of(size)?;
        if quantity.value() > stock {
            return Err(CommerceError::InsufficientStock { requested: quantity.value(), available: stock });
        }
        Ok(stock)
    }

    async fn persist(&self, mut cart: Cart) -> Result<Cart> {
        let events = cart.take_events();
        let cart = self.carts.save_cart(cart).await?;
        self.events.publish(events).await;
        Ok(cart)
    }
}
