//! Domain layer: aggregates, value objects and the events they raise.
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::{CartEvent, DomainEvent, OrderEvent, ProductEvent};
pub use value_objects::{Money, Quantity, Size};
