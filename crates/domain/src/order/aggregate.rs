//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, BuyerId, ContactId, Money, OrderId};
use event_store::Version;
use inventory::{ReservationId, StockLine};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    OrderError, OrderEvent, OrderLine, OrderState,
    events::{OrderCanceledData, OrderPlacedData},
};

/// Order aggregate root.
///
/// Created only by checkout, already in `New`. Lines never change after
/// that; the state moves forward one step at a time or to `Canceled`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,

    #[serde(default)]
    version: Version,

    buyer_id: Option<BuyerId>,

    contact_id: Option<ContactId>,

    state: OrderState,

    /// Sorted by SKU.
    lines: Vec<OrderLine>,

    total_amount: Money,

    reservation_id: Option<ReservationId>,

    placed_at: Option<DateTime<Utc>>,

    cancellation: Option<Cancellation>,
}

/// Why and by whom an order was canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub from: OrderState,
    pub reason: String,
    pub canceled_by: Option<String>,
    pub canceled_at: DateTime<Utc>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(AggregateId::from)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderAdvanced(data) => self.state = data.to,
            OrderEvent::OrderCanceled(data) => self.apply_order_canceled(data),
        }
    }
}

// Query methods
impl Order {
    pub fn order_id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn buyer_id(&self) -> Option<BuyerId> {
        self.buyer_id
    }

    pub fn contact_id(&self) -> Option<ContactId> {
        self.contact_id
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn reservation_id(&self) -> Option<ReservationId> {
        self.reservation_id
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True if `buyer_id` placed this order.
    pub fn is_owned_by(&self, buyer_id: BuyerId) -> bool {
        self.buyer_id == Some(buyer_id)
    }

    /// The stock reserved for this order, one line per SKU.
    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.lines.iter().map(OrderLine::stock_line).collect()
    }
}

// Command methods (return events)
impl Order {
    /// Materializes a committed cart as a new order.
    pub fn place(
        &self,
        order_id: OrderId,
        buyer_id: BuyerId,
        contact_id: Option<ContactId>,
        mut lines: Vec<OrderLine>,
        reservation_id: ReservationId,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }

        Self::total_of(&lines)?;
        self.check_transition(OrderState::New)?;

        lines.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(vec![OrderEvent::order_placed(
            order_id,
            buyer_id,
            contact_id,
            lines,
            reservation_id,
        )])
    }

    /// Validates `lines` and returns their total.
    ///
    /// Rejects a total that overflows, so an event that could not be
    /// replayed is never produced.
    pub fn total_of(lines: &[OrderLine]) -> Result<Money, OrderError> {
        let mut total = Money::ZERO;
        for line in lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    sku: line.sku.clone(),
                    quantity: line.quantity,
                });
            }
            if !line.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    sku: line.sku.clone(),
                    price: line.unit_price,
                });
            }
            total = line
                .unit_price
                .checked_times(line.quantity)
                .and_then(|amount| total.checked_add(amount))
                .ok_or(OrderError::AmountOverflow)?;
        }
        Ok(total)
    }

    /// Moves the order one fulfillment step forward to `to`.
    ///
    /// Use [`cancel`](Self::cancel) for cancellation; it has to carry a
    /// reason.
    pub fn advance(&self, to: OrderState) -> Result<Vec<OrderEvent>, OrderError> {
        if to == OrderState::Canceled {
            return self.cancel("canceled", None);
        }
        let to = self.check_transition(to)?;
        Ok(vec![OrderEvent::order_advanced(self.state, to)])
    }

    /// Cancels the order.
    ///
    /// Fails with `AlreadyTerminal` for delivered or already canceled
    /// orders, which is what stops a second release of the same stock.
    pub fn cancel(
        &self,
        reason: impl Into<String>,
        canceled_by: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.check_transition(OrderState::Canceled)?;
        Ok(vec![OrderEvent::order_canceled(
            self.state,
            reason,
            canceled_by,
        )])
    }

    fn check_transition(&self, to: OrderState) -> Result<OrderState, OrderError> {
        self.state
            .transition(to)
            .map_err(|rejection| OrderError::InvalidTransition {
                from: self.state,
                to,
                rejection,
            })
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.buyer_id = Some(data.buyer_id);
        self.contact_id = data.contact_id;
        self.total_amount = data.lines.iter().map(OrderLine::amount).sum();
        self.lines = data.lines;
        self.reservation_id = Some(data.reservation_id);
        self.placed_at = Some(data.placed_at);
        self.state = OrderState::New;
    }

    fn apply_order_canceled(&mut self, data: OrderCanceledData) {
        self.state = OrderState::Canceled;
        self.cancellation = Some(Cancellation {
            from: data.from,
            reason: data.reason,
            canceled_by: data.canceled_by,
            canceled_at: data.canceled_at,
        });
    }
}
