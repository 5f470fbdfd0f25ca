//! Fashion Commerce
//!
//! Backend for a clothing store with per-size inventory.
//!
//! ## Features
//! - Product catalog with S/M/L/XL stock variants
//! - Per-user shopping cart validated against live stock
//! - Order placement and VNPay checkout
//! - Payment callback reconciliation (stock decrement + cart clearing)

pub mod config;
pub mod domain;
pub mod events;
pub mod http;
pub mod payment;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::domain::{CartError, ProductError};
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Product is not in the cart")]
    LineItemNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Invalid payment signature")]
    SignatureMismatch,

    #[error("Concurrent modification, please retry")]
    Conflict,

    #[error("Stock update failed: {0}")]
    StockUpdate(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl From<ProductError> for CommerceError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::SizeUnavailable(_) => Self::InvalidInput(e.to_string()),
            ProductError::InsufficientStock { requested, available } => Self::InsufficientStock { requested, available },
        }
    }
}

impl From<CartError> for CommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::LineItemNotFound,
            CartError::ExceedsStock { requested, available } => Self::InsufficientStock { requested, available },
        }
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
