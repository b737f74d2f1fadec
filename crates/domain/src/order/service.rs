//! Order service: the state machine's entry point and its side effects.

use std::sync::Arc;

use common::{BuyerId, OrderId};
use event_store::EventStore;
use inventory::StockLedger;

use crate::aggregate::Aggregate;
use crate::command::{Command, CommandHandler, CommandResult, RetryPolicy};
use crate::error::DomainError;
use crate::notify::{OrderNotification, OrderNotifier, TracingNotifier};

use super::{CancelOrder, Order, OrderEvent, OrderState, PlaceOrder, TransitionOrder};

/// Service for managing orders.
///
/// Every state change goes through [`Order`]'s command methods, which
/// consult [`OrderState::transition`]. Cancellation releases the order's
/// stock only after the `OrderCanceled` event is durable, so of two racing
/// cancellations exactly one releases and the other fails as already
/// terminal.
pub struct OrderService<S, L>
where
    S: EventStore,
    L: StockLedger,
{
    handler: CommandHandler<S, Order>,
    ledger: L,
    notifier: Arc<dyn OrderNotifier>,
    retry: RetryPolicy,
}

impl<S, L> OrderService<S, L>
where
    S: EventStore,
    L: StockLedger,
{
    pub fn new(store: S, ledger: L) -> Self {
        Self {
            handler: CommandHandler::new(store),
            ledger,
            notifier: Arc::new(TracingNotifier),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    pub fn notifier(&self) -> &Arc<dyn OrderNotifier> {
        &self.notifier
    }

    /// Records a new order in `New`. Stock must already be reserved.
    ///
    /// Does not notify; checkout does that once the cart is converted too.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, buyer_id = %cmd.buyer_id))]
    pub async fn place(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let result = self
            .handler
            .execute(cmd.aggregate_id(), |order| {
                order.place(
                    cmd.order_id,
                    cmd.buyer_id,
                    cmd.contact_id,
                    cmd.lines.clone(),
                    cmd.reservation_id,
                )
            })
            .await?;

        metrics::counter!("order_transitions_total", "to" => OrderState::New.as_str())
            .increment(1);
        Ok(result.aggregate)
    }

    /// Moves an order to `cmd.to`.
    ///
    /// Only the next fulfillment step is accepted; a target of `Canceled`
    /// behaves like [`cancel`](Self::cancel).
    #[tracing::instrument(skip(self))]
    pub async fn transition(&self, cmd: TransitionOrder) -> Result<Order, DomainError> {
        if cmd.to == OrderState::Canceled {
            return self.cancel(CancelOrder::new(cmd.order_id, "canceled")).await;
        }

        self.ensure_exists(cmd.order_id).await?;
        let result = self
            .handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |order| {
                order.advance(cmd.to)
            })
            .await?;

        self.after_transition(cmd.order_id, &result).await;
        Ok(result.aggregate)
    }

    /// Cancels an order and puts its stock back.
    ///
    /// A second cancellation fails with an `AlreadyTerminal` transition
    /// error and releases nothing. If the release itself fails the order
    /// stays canceled and `ReleaseFailed` is returned.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, cmd: CancelOrder) -> Result<Order, DomainError> {
        self.ensure_exists(cmd.order_id).await?;
        let result = self
            .handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |order| {
                order.cancel(cmd.reason.clone(), cmd.canceled_by.clone())
            })
            .await?;

        let released = self.release_stock(cmd.order_id, &result.aggregate).await;
        self.after_transition(cmd.order_id, &result).await;
        released?;

        Ok(result.aggregate)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id.into()).await
    }

    /// Loads an order on behalf of a buyer.
    ///
    /// Another buyer's order is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        match self.get_order(order_id).await? {
            Some(order) if order.is_owned_by(buyer_id) => Ok(order),
            _ => Err(DomainError::OrderNotFound(order_id)),
        }
    }

    /// A buyer's orders, newest first. Carts are not orders and never
    /// appear here.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, buyer_id: BuyerId) -> Result<Vec<Order>, DomainError> {
        let placed = self.handler.store().events_of_type("OrderPlaced").await?;

        let mut orders = Vec::new();
        for envelope in placed {
            let OrderEvent::OrderPlaced(data) = envelope.decode::<OrderEvent>()? else {
                continue;
            };
            if data.buyer_id != buyer_id {
                continue;
            }
            if let Some(order) = self.get_order(data.order_id).await? {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        Ok(orders)
    }

    /// Fails with `OrderNotFound` unless `order_id` names a placed order.
    /// Any other stream under that id, such as a cart, does not count.
    async fn ensure_exists(&self, order_id: OrderId) -> Result<(), DomainError> {
        match self.get_order(order_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::OrderNotFound(order_id)),
        }
    }

    async fn release_stock(&self, order_id: OrderId, order: &Order) -> Result<(), DomainError> {
        let lines = order.stock_lines();
        match self.ledger.release(&lines).await {
            Ok(()) => {
                tracing::info!(%order_id, lines = lines.len(), "stock released for canceled order");
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    %order_id,
                    error = %source,
                    "order canceled but stock release failed"
                );
                Err(DomainError::ReleaseFailed { order_id, source })
            }
        }
    }

    async fn after_transition(&self, order_id: OrderId, result: &CommandResult<Order>) {
        let Some(event) = result.events.first() else {
            return;
        };
        let from = match event {
            OrderEvent::OrderAdvanced(data) => data.from,
            OrderEvent::OrderCanceled(data) => data.from,
            OrderEvent::OrderPlaced(_) => OrderState::Basket,
        };
        let to = result.aggregate.state();
        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);

        if let Some(buyer_id) = result.aggregate.buyer_id() {
            self.notifier
                .notify(OrderNotification::new(order_id, buyer_id, from, to))
                .await;
        }
        tracing::info!(%order_id, %from, %to, version = %result.aggregate.version(), "order transitioned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::notify::InMemoryNotifier;
    use crate::order::{OrderError, OrderLine, TransitionRejection};
    use common::{Money, Sku};
    use event_store::InMemoryEventStore;
    use inventory::{InMemoryStockLedger, StockLine};

    struct Harness {
        service: OrderService<InMemoryEventStore, InMemoryStockLedger>,
        ledger: InMemoryStockLedger,
        notifier: InMemoryNotifier,
    }

    async fn harness() -> Harness {
        let ledger = InMemoryStockLedger::new();
        ledger.set_quantity("Y", 10).await;
        let notifier = InMemoryNotifier::new();
        let service = OrderService::new(InMemoryEventStore::new(), ledger.clone())
            .with_notifier(Arc::new(notifier.clone()));
        Harness {
            service,
            ledger,
            notifier,
        }
    }

    /// Reserves 4 of Y and places an order for them, as checkout would.
    async fn place_reserved(h: &Harness, buyer_id: BuyerId) -> OrderId {
        let token = h
            .ledger
            .reserve_all(&[StockLine::new("Y", 4)])
            .await
            .unwrap();
        let order_id = OrderId::new();
        h.service
            .place(PlaceOrder {
                order_id,
                buyer_id,
                contact_id: None,
                lines: vec![OrderLine::new("Y", "Gadget", 4, Money::from_minor(300))],
                reservation_id: token.reservation_id,
            })
            .await
            .unwrap();
        order_id
    }

    #[tokio::test]
    async fn cancel_releases_stock_once() {
        let h = harness().await;
        let order_id = place_reserved(&h, BuyerId::new()).await;
        assert_eq!(h.ledger.peek(&Sku::new("Y")).await.unwrap(), 6);

        let order = h
            .service
            .cancel(CancelOrder::new(order_id, "test"))
            .await
            .unwrap();
        assert_eq!(order.state(), OrderState::Canceled);
        assert_eq!(h.ledger.peek(&Sku::new("Y")).await.unwrap(), 10);

        let err = h
            .service
            .cancel(CancelOrder::new(order_id, "again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidTransition {
                rejection: TransitionRejection::AlreadyTerminal,
                ..
            })
        ));
        assert_eq!(h.ledger.peek(&Sku::new("Y")).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn transitions_notify_with_origin_state() {
        let h = harness().await;
        let order_id = place_reserved(&h, BuyerId::new()).await;

        h.service
            .transition(TransitionOrder::new(order_id, OrderState::Confirmed))
            .await
            .unwrap();

        let seen = h.notifier.for_order(order_id).await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].from, OrderState::New);
        assert_eq!(seen[0].to, OrderState::Confirmed);
    }

    #[tokio::test]
    async fn non_adjacent_transition_has_no_side_effect() {
        let h = harness().await;
        let order_id = place_reserved(&h, BuyerId::new()).await;

        let err = h
            .service
            .transition(TransitionOrder::new(order_id, OrderState::Sent))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidTransition {
                rejection: TransitionRejection::NotAdjacent,
                ..
            })
        ));
        assert!(h.notifier.notifications().await.is_empty());
        assert_eq!(
            h.service.get_order(order_id).await.unwrap().unwrap().state(),
            OrderState::New
        );
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let h = harness().await;
        let missing = OrderId::new();

        let err = h
            .service
            .cancel(CancelOrder::new(missing, "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn cart_stream_under_the_same_id_is_not_an_order() {
        let store = InMemoryEventStore::new();
        let ledger = InMemoryStockLedger::new();
        let service = OrderService::new(store.clone(), ledger);
        let buyer = BuyerId::new();
        let carts: CommandHandler<_, Cart> = CommandHandler::new(store);
        carts
            .execute(buyer.into(), |cart| {
                cart.add_line(buyer, Sku::new("Y"), 1, 10)
            })
            .await
            .unwrap();
        // Cart streams are keyed by the buyer's uuid.
        let order_id = OrderId::from_uuid(buyer.as_uuid());

        assert!(service.get_order(order_id).await.unwrap().is_none());
        assert!(matches!(
            service.get_order_for(buyer, order_id).await,
            Err(DomainError::OrderNotFound(_))
        ));
        assert!(matches!(
            service.cancel(CancelOrder::new(order_id, "nope")).await,
            Err(DomainError::OrderNotFound(id)) if id == order_id
        ));
        assert!(matches!(
            service
                .transition(TransitionOrder::new(order_id, OrderState::Confirmed))
                .await,
            Err(DomainError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn orders_are_private_to_their_buyer() {
        let h = harness().await;
        let owner = BuyerId::new();
        let order_id = place_reserved(&h, owner).await;

        assert!(h.service.get_order_for(owner, order_id).await.is_ok());
        assert!(matches!(
            h.service.get_order_for(BuyerId::new(), order_id).await,
            Err(DomainError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_orders_newest_first_per_buyer() {
        let h = harness().await;
        h.ledger.restock("Y", 20).await.unwrap();
        let buyer = BuyerId::new();
        let first = place_reserved(&h, buyer).await;
        let second = place_reserved(&h, buyer).await;
        place_reserved(&h, BuyerId::new()).await;

        let orders = h.service.list_orders(buyer).await.unwrap();
        let ids: Vec<_> = orders.iter().filter_map(Order::order_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first) && ids.contains(&second));
        assert!(orders[0].placed_at() >= orders[1].placed_at());
    }

    #[tokio::test]
    async fn release_failure_keeps_order_canceled() {
        let ledger = InMemoryStockLedger::new();
        let service = OrderService::new(InMemoryEventStore::new(), ledger.clone());
        let order_id = OrderId::new();
        // Ledger never heard of "GONE", so the release is an integrity fault.
        service
            .place(PlaceOrder {
                order_id,
                buyer_id: BuyerId::new(),
                contact_id: None,
                lines: vec![OrderLine::new("GONE", "Ghost", 1, Money::from_minor(1))],
                reservation_id: inventory::ReservationId::new(),
            })
            .await
            .unwrap();

        let err = service
            .cancel(CancelOrder::new(order_id, "test"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ReleaseFailed { .. }));
        assert_eq!(
            service.get_order(order_id).await.unwrap().unwrap().state(),
            OrderState::Canceled
        );
    }
}
