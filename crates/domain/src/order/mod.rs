//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::{Cancellation, Order};
pub use commands::*;
pub use events::{OrderAdvancedData, OrderCanceledData, OrderEvent, OrderPlacedData};
pub use service::OrderService;
pub use state::{OrderState, TransitionRejection};
pub use value_objects::OrderLine;

use common::{Money, Sku};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The state machine refused the move. No side effect happened.
    #[error("Invalid transition from {from} to {to}: {rejection}")]
    InvalidTransition {
        from: OrderState,
        to: OrderState,
        rejection: TransitionRejection,
    },

    #[error("Invalid quantity {quantity} for {sku} (must be greater than 0)")]
    InvalidQuantity { sku: Sku, quantity: u32 },

    #[error("Invalid price {price} for {sku} (must be greater than 0)")]
    InvalidPrice { sku: Sku, price: Money },

    #[error("Order total does not fit in a money amount")]
    AmountOverflow,

    #[error("Order has no lines")]
    NoLines,

    #[error("Order already placed")]
    AlreadyPlaced,
}
