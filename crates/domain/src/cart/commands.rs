//! Cart commands. Every command is keyed by the buyer, whose id is also the
//! cart's stream id.

use common::{AggregateId, BuyerId, Sku};

use crate::command::Command;

use super::Cart;

/// Command to add units of a SKU to the buyer's cart.
#[derive(Debug, Clone)]
pub struct AddLine {
    pub buyer_id: BuyerId,
    pub sku: Sku,
    pub quantity: u32,
}

impl AddLine {
    pub fn new(buyer_id: BuyerId, sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            buyer_id,
            sku: sku.into(),
            quantity,
        }
    }
}

impl Command for AddLine {
    type Aggregate = Cart;

    fn aggregate_id(&self) -> AggregateId {
        self.buyer_id.into()
    }
}

/// Command to set the quantity of an existing line.
#[derive(Debug, Clone)]
pub struct UpdateLine {
    pub buyer_id: BuyerId,
    pub sku: Sku,
    pub quantity: u32,
}

impl UpdateLine {
    pub fn new(buyer_id: BuyerId, sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            buyer_id,
            sku: sku.into(),
            quantity,
        }
    }
}

impl Command for UpdateLine {
    type Aggregate = Cart;

    fn aggregate_id(&self) -> AggregateId {
        self.buyer_id.into()
    }
}

#[derive(Debug, Clone)]
pub struct RemoveLine {
    pub buyer_id: BuyerId,
    pub sku: Sku,
}

impl RemoveLine {
    pub fn new(buyer_id: BuyerId, sku: impl Into<Sku>) -> Self {
        Self {
            buyer_id,
            sku: sku.into(),
        }
    }
}

impl Command for RemoveLine {
    type Aggregate = Cart;

    fn aggregate_id(&self) -> AggregateId {
        self.buyer_id.into()
    }
}

#[derive(Debug, Clone)]
pub struct ClearCart {
    pub buyer_id: BuyerId,
}

impl ClearCart {
    pub fn new(buyer_id: BuyerId) -> Self {
        Self { buyer_id }
    }
}

impl Command for ClearCart {
    type Aggregate = Cart;

    fn aggregate_id(&self) -> AggregateId {
        self.buyer_id.into()
    }
}
