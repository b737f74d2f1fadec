//! Reservation coordinator: the only path from a cart to an order.

use std::sync::Arc;
use std::time::Instant;

use common::{BuyerId, ContactId, OrderId};
use domain::{
    CancelOrder, CartService, DomainError, Order, OrderLine, OrderNotification, OrderService,
    OrderState, PlaceOrder,
};
use event_store::EventStore;
use inventory::{
    Catalog, CatalogError, LedgerError, ReservationToken, Shortage, StockLedger, StockLine,
};

use crate::error::{CommitError, Result, UnavailableLine};

/// Reason recorded on orders canceled because their cart moved on.
pub const CART_CHANGED_REASON: &str = "cart changed during checkout";

/// Commits buyers' carts to orders.
///
/// Stock is reserved for the whole cart before the order exists, so every
/// step after the reservation has a compensation: release the reservation
/// while no order exists, cancel the order (which releases) once it does.
pub struct ReservationCoordinator<S, L, C>
where
    S: EventStore,
    L: StockLedger,
    C: Catalog,
{
    carts: Arc<CartService<S, L, C>>,
    orders: Arc<OrderService<S, L>>,
    ledger: L,
    catalog: C,
}

impl<S, L, C> ReservationCoordinator<S, L, C>
where
    S: EventStore,
    L: StockLedger,
    C: Catalog,
{
    /// `ledger` and `catalog` must be the same instances the services use.
    pub fn new(
        carts: Arc<CartService<S, L, C>>,
        orders: Arc<OrderService<S, L>>,
        ledger: L,
        catalog: C,
    ) -> Self {
        Self {
            carts,
            orders,
            ledger,
            catalog,
        }
    }

    pub fn carts(&self) -> &Arc<CartService<S, L, C>> {
        &self.carts
    }

    pub fn orders(&self) -> &Arc<OrderService<S, L>> {
        &self.orders
    }

    /// Converts the buyer's cart into an order in state `New`.
    ///
    /// Commits for one buyer run one at a time.
    ///
    /// On `Unavailable` no stock moved and the cart is untouched. On success
    /// the cart is empty, stock for every line is reserved and the order's
    /// prices are copies of the catalog's prices at this moment.
    #[tracing::instrument(skip(self))]
    pub async fn commit(&self, buyer_id: BuyerId, contact_id: Option<ContactId>) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_commit(buyer_id, contact_id).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("checkout_commits_total").increment(1);
                tracing::info!(
                    order_id = ?order.order_id(),
                    total = %order.total_amount(),
                    "checkout committed"
                );
            }
            Err(CommitError::Unavailable { lines }) => {
                metrics::counter!("checkout_unavailable_total").increment(1);
                tracing::info!(lines = lines.len(), "checkout rejected, stock unavailable");
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "checkout failed");
            }
        }

        result
    }

    async fn try_commit(&self, buyer_id: BuyerId, contact_id: Option<ContactId>) -> Result<Order> {
        // Held until the cart is checked out; a second submit of the same
        // cart waits here and then finds it empty.
        let _cart_lock = self.carts.lock_cart(buyer_id).await;
        let cart = self.carts.get_cart(buyer_id).await?;
        if cart.is_empty() {
            return Err(CommitError::EmptyCart);
        }
        let snapshot = cart.snapshot();

        let token = match self.ledger.reserve_all(&snapshot).await {
            Ok(token) => token,
            Err(LedgerError::InsufficientStock { shortages }) => {
                return Err(CommitError::Unavailable {
                    lines: self.describe_shortages(shortages).await,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "stock reservation hit an integrity fault");
                return Err(CommitError::Integrity(e.to_string()));
            }
        };

        let lines = match self.price_lines(&snapshot).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!(error = %e, "cart line has no catalog entry");
                self.release_reservation(&token).await?;
                return Err(CommitError::Integrity(e.to_string()));
            }
        };

        let order_id = OrderId::new();
        let placed = self
            .orders
            .place(PlaceOrder {
                order_id,
                buyer_id,
                contact_id,
                lines,
                reservation_id: token.reservation_id,
            })
            .await;
        let order = match placed {
            Ok(order) => order,
            Err(e) => {
                self.release_reservation(&token).await?;
                return Err(e.into());
            }
        };

        if let Err(e) = self.carts.check_out(buyer_id, order_id, &snapshot).await {
            self.cancel_placed(order_id, &e).await?;
            return Err(match e {
                DomainError::Cart(_) => CommitError::CartChanged,
                other => other.into(),
            });
        }

        self.orders
            .notifier()
            .notify(OrderNotification::new(
                order_id,
                buyer_id,
                OrderState::Basket,
                OrderState::New,
            ))
            .await;

        Ok(order)
    }

    /// Snapshot lines with name and price captured now.
    async fn price_lines(
        &self,
        snapshot: &[StockLine],
    ) -> std::result::Result<Vec<OrderLine>, CatalogError> {
        let mut lines = Vec::with_capacity(snapshot.len());
        for line in snapshot {
            let entry = self.catalog.lookup(&line.sku).await?;
            lines.push(OrderLine::new(
                line.sku.clone(),
                entry.name,
                line.quantity,
                entry.unit_price,
            ));
        }
        Ok(lines)
    }

    async fn describe_shortages(&self, shortages: Vec<Shortage>) -> Vec<UnavailableLine> {
        let mut lines = Vec::with_capacity(shortages.len());
        for shortage in shortages {
            let name = match self.catalog.lookup_display_name(&shortage.sku).await {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::error!(sku = %shortage.sku, error = %e, "no display name for unavailable line");
                    None
                }
            };
            lines.push(UnavailableLine {
                sku: shortage.sku,
                name,
                available: shortage.available,
                requested: shortage.requested,
            });
        }
        lines
    }

    /// Compensation while no order exists yet.
    async fn release_reservation(&self, token: &ReservationToken) -> Result<()> {
        metrics::counter!("checkout_compensations_total").increment(1);
        tracing::warn!(
            reservation_id = %token.reservation_id,
            units = token.total_units(),
            "releasing reservation of failed checkout"
        );
        self.ledger.release(&token.lines).await.map_err(|e| {
            tracing::error!(reservation_id = %token.reservation_id, error = %e, "reservation release failed");
            CommitError::CompensationFailed {
                order_id: None,
                reason: e.to_string(),
            }
        })
    }

    /// Compensation once the order exists: cancel it through the state
    /// machine, which releases its stock exactly once.
    async fn cancel_placed(&self, order_id: OrderId, cause: &DomainError) -> Result<()> {
        metrics::counter!("checkout_compensations_total").increment(1);
        tracing::warn!(%order_id, error = %cause, "cart changed during checkout, canceling order");

        self.orders
            .cancel(CancelOrder::new(order_id, CART_CHANGED_REASON).by("checkout"))
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(%order_id, error = %e, "canceling order of failed checkout failed");
                CommitError::CompensationFailed {
                    order_id: Some(order_id),
                    reason: e.to_string(),
                }
            })
    }
}
