//! Order commands.

use common::{AggregateId, BuyerId, ContactId, OrderId};
use inventory::ReservationId;

use crate::command::Command;

use super::{Order, OrderLine, OrderState};

/// Command to materialize a committed cart. Issued only by checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub buyer_id: BuyerId,
    pub contact_id: Option<ContactId>,
    pub lines: Vec<OrderLine>,
    pub reservation_id: ReservationId,
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.into()
    }
}

/// Command to move an order to another state.
///
/// A target of `Canceled` is treated as a cancellation without a reason.
#[derive(Debug, Clone)]
pub struct TransitionOrder {
    pub order_id: OrderId,
    pub to: OrderState,
}

impl TransitionOrder {
    pub fn new(order_id: OrderId, to: OrderState) -> Self {
        Self { order_id, to }
    }
}

impl Command for TransitionOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.into()
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: String,
    pub canceled_by: Option<String>,
}

impl CancelOrder {
    pub fn new(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
            canceled_by: None,
        }
    }

    pub fn by(mut self, canceled_by: impl Into<String>) -> Self {
        self.canceled_by = Some(canceled_by.into());
        self
    }
}

impl Command for CancelOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.into()
    }
}
