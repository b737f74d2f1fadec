//! Checkout error types.

use common::{OrderId, Sku};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// A cart line the ledger could not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableLine {
    pub sku: Sku,

    /// Display name, if the catalog still knows the SKU.
    pub name: Option<String>,

    pub available: u32,
    pub requested: u32,
}

/// Errors that can occur while committing a cart.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Nothing to commit.
    #[error("Cart is empty")]
    EmptyCart,

    /// Some lines exceed available stock. Nothing was reserved and the cart
    /// is untouched.
    #[error("Not enough stock for {} line(s)", lines.len())]
    Unavailable { lines: Vec<UnavailableLine> },

    /// The cart was edited or checked out by a concurrent request after the
    /// snapshot was taken. Any stock reserved for this attempt is back.
    #[error("Cart changed during checkout; nothing was committed")]
    CartChanged,

    /// A cart line refers to a SKU the ledger or catalog no longer knows.
    #[error("Data integrity fault during checkout: {0}")]
    Integrity(String),

    /// Undoing a partial checkout failed. Stock may be stranded.
    #[error("Checkout compensation failed{}: {reason}", for_order(order_id))]
    CompensationFailed {
        order_id: Option<OrderId>,
        reason: String,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl CommitError {
    /// Metric label for the outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            CommitError::EmptyCart => "empty_cart",
            CommitError::Unavailable { .. } => "unavailable",
            CommitError::CartChanged => "cart_changed",
            CommitError::Integrity(_) => "integrity",
            CommitError::CompensationFailed { .. } => "compensation_failed",
            CommitError::Domain(_) => "domain",
        }
    }
}

fn for_order(order_id: &Option<OrderId>) -> String {
    match order_id {
        Some(id) => format!(" for order {id}"),
        None => String::new(),
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CommitError>;
