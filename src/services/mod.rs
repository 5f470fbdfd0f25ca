//! Application services. Each one runs a read-validate-write cycle against
//! the stores and publishes the domain events the aggregates raised.

mod cart;
mod catalog;
mod checkout;
mod order;

pub use cart::{CartItemInput, CartLineView, CartService, CartView, ProductSummary};
pub use catalog::{CatalogService, CreateProductInput, ListParams, ProductPage};
pub use checkout::{CheckoutOutcome, CheckoutService, StockBatch, StockFailurePolicy, StockLineOutcome};
pub use order::{OrderService, PlaceOrderInput};

use std::future::Future;

use crate::store::StoreError;
use crate::{CommerceError, Result};

/// Attempts per optimistic write before giving up with [`CommerceError::Conflict`].
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Re-runs `op` from a fresh read whenever its conditional write lost a race.
pub(crate) async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        match op().await {
            Err(CommerceError::Store(StoreError::Conflict)) => {
                tracing::debug!(operation, attempt, "write conflict, retrying");
            }
            result => return result,
        }
    }
    tracing::warn!(operation, attempts = MAX_WRITE_ATTEMPTS, "giving up after repeated write conflicts");
    Err(CommerceError::Conflict)
}
