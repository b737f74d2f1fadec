//! Cart domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, BuyerId, OrderId, Sku};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a cart aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// First addition by a buyer created their cart.
    CartOpened(CartOpenedData),

    /// Units of a SKU were added, creating the line if needed.
    LineAdded(LineAddedData),

    LineQuantityChanged(LineQuantityChangedData),

    LineRemoved(LineRemovedData),

    /// Every line was dropped. The cart stays open.
    CartCleared(CartClearedData),

    /// The lines became an order. The cart is empty afterwards.
    CartCheckedOut(CartCheckedOutData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartOpened(_) => "CartOpened",
            CartEvent::LineAdded(_) => "LineAdded",
            CartEvent::LineQuantityChanged(_) => "LineQuantityChanged",
            CartEvent::LineRemoved(_) => "LineRemoved",
            CartEvent::CartCleared(_) => "CartCleared",
            CartEvent::CartCheckedOut(_) => "CartCheckedOut",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOpenedData {
    pub cart_id: AggregateId,
    pub buyer_id: BuyerId,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAddedData {
    pub sku: Sku,

    /// Units added on top of any existing line.
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineQuantityChangedData {
    pub sku: Sku,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRemovedData {
    pub sku: Sku,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    pub cleared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckedOutData {
    /// The order the lines were committed to.
    pub order_id: OrderId,
    pub checked_out_at: DateTime<Utc>,
}

impl CartEvent {
    pub fn cart_opened(cart_id: AggregateId, buyer_id: BuyerId) -> Self {
        CartEvent::CartOpened(CartOpenedData {
            cart_id,
            buyer_id,
            opened_at: Utc::now(),
        })
    }

    pub fn line_added(sku: Sku, quantity: u32) -> Self {
        CartEvent::LineAdded(LineAddedData { sku, quantity })
    }

    pub fn line_quantity_changed(sku: Sku, old_quantity: u32, new_quantity: u32) -> Self {
        CartEvent::LineQuantityChanged(LineQuantityChangedData {
            sku,
            old_quantity,
            new_quantity,
        })
    }

    pub fn line_removed(sku: Sku) -> Self {
        CartEvent::LineRemoved(LineRemovedData { sku })
    }

    pub fn cart_cleared() -> Self {
        CartEvent::CartCleared(CartClearedData {
            cleared_at: Utc::now(),
        })
    }

    pub fn cart_checked_out(order_id: OrderId) -> Self {
        CartEvent::CartCheckedOut(CartCheckedOutData {
            order_id,
            checked_out_at: Utc::now(),
        })
    }
}
