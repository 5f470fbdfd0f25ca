//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Discount, Product, ProductError, Variant};
pub use order::{Order, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use cart::{Cart, CartError, LineItem};
