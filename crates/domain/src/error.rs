//! Domain error types.

use common::{AggregateId, OrderId};
use event_store::EventStoreError;
use inventory::{CatalogError, LedgerError};
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A cart command was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An order command was rejected.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Stock ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No order with this id, or it belongs to another buyer.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order was canceled but its stock could not be put back. The
    /// cancellation stands; the stock needs manual reconciliation.
    #[error("Order {order_id} canceled but releasing its stock failed: {source}")]
    ReleaseFailed {
        order_id: OrderId,
        source: LedgerError,
    },

    /// The stream exists but was written by another kind of aggregate.
    #[error("Stream {stream_id} holds {found} events, not {expected}")]
    StreamTypeMismatch {
        stream_id: AggregateId,
        expected: &'static str,
        found: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when the command lost an append race and may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_conflict())
    }

    /// True for faults caused by inconsistent data rather than by the
    /// caller's input.
    pub fn is_integrity_fault(&self) -> bool {
        match self {
            DomainError::Ledger(e) => e.is_integrity_fault(),
            DomainError::Catalog(_) | DomainError::ReleaseFailed { .. } => true,
            DomainError::Serialization(_) => true,
            _ => false,
        }
    }
}
