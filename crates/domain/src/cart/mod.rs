//! Cart aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod view;

pub use aggregate::Cart;
pub use commands::*;
pub use events::{
    CartCheckedOutData, CartClearedData, CartEvent, CartOpenedData, LineAddedData,
    LineQuantityChangedData, LineRemovedData,
};
pub use service::CartService;
pub use view::{CartLineView, CartView};

use common::Sku;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Invalid quantity {quantity} for {sku} (must be greater than 0)")]
    InvalidQuantity { sku: Sku, quantity: u32 },

    #[error("No line for {sku} in the cart")]
    LineNotFound { sku: Sku },

    /// The SKU is not offered at all.
    #[error("Unknown product: {sku}")]
    UnknownProduct { sku: Sku },

    /// Advisory pre-check failed. Checkout validates again regardless.
    #[error("Not enough stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: Sku,
        available: u32,
        requested: u32,
    },

    #[error("Quantity for {sku} is too large")]
    QuantityOverflow { sku: Sku },

    #[error("Cart total does not fit in a money amount")]
    AmountOverflow,

    #[error("Cart is empty")]
    EmptyCart,

    /// The cart no longer matches the snapshot a checkout reserved stock
    /// for.
    #[error("Cart changed while it was being checked out")]
    ChangedDuringCheckout,
}
