//! Order domain events.

use chrono::{DateTime, Utc};
use common::{BuyerId, ContactId, OrderId};
use inventory::ReservationId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{OrderLine, OrderState};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A checkout committed a cart; stock is already reserved.
    OrderPlaced(OrderPlacedData),

    /// One forward fulfillment step.
    OrderAdvanced(OrderAdvancedData),

    /// The order was canceled and its stock is due back.
    OrderCanceled(OrderCanceledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderAdvanced(_) => "OrderAdvanced",
            OrderEvent::OrderCanceled(_) => "OrderCanceled",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub buyer_id: BuyerId,

    /// Shipping contact, resolved outside the core.
    pub contact_id: Option<ContactId>,

    /// Lines with prices captured at checkout, sorted by SKU.
    pub lines: Vec<OrderLine>,

    /// The reservation that decremented stock for these lines.
    pub reservation_id: ReservationId,

    pub placed_at: DateTime<Utc>,
}

/// Data for OrderAdvanced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAdvancedData {
    pub from: OrderState,
    pub to: OrderState,
    pub advanced_at: DateTime<Utc>,
}

/// Data for OrderCanceled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCanceledData {
    /// State the order was in when canceled.
    pub from: OrderState,
    pub reason: String,
    pub canceled_by: Option<String>,
    pub canceled_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn order_placed(
        order_id: OrderId,
        buyer_id: BuyerId,
        contact_id: Option<ContactId>,
        lines: Vec<OrderLine>,
        reservation_id: ReservationId,
    ) -> Self {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            buyer_id,
            contact_id,
            lines,
            reservation_id,
            placed_at: Utc::now(),
        })
    }

    pub fn order_advanced(from: OrderState, to: OrderState) -> Self {
        OrderEvent::OrderAdvanced(OrderAdvancedData {
            from,
            to,
            advanced_at: Utc::now(),
        })
    }

    pub fn order_canceled(
        from: OrderState,
        reason: impl Into<String>,
        canceled_by: Option<String>,
    ) -> Self {
        OrderEvent::OrderCanceled(OrderCanceledData {
            from,
            reason: reason.into(),
            canceled_by,
            canceled_at: Utc::now(),
        })
    }

    /// State the order is in after this event.
    pub fn resulting_state(&self) -> OrderState {
        match self {
            OrderEvent::OrderPlaced(_) => OrderState::New,
            OrderEvent::OrderAdvanced(data) => data.to,
            OrderEvent::OrderCanceled(_) => OrderState::Canceled,
        }
    }
}
