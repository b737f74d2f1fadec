//! Cart service: buyer-facing cart mutations with an advisory stock check.

use std::collections::HashMap;
use std::sync::Arc;

use common::{BuyerId, OrderId, Sku};
use event_store::EventStore;
use inventory::{Catalog, LedgerError, StockLedger, StockLine};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::command::{Command, CommandHandler, CommandResult, RetryPolicy};
use crate::error::DomainError;

use super::{
    AddLine, Cart, CartError, CartLineView, CartView, ClearCart, RemoveLine, UpdateLine,
};

/// Service for managing buyers' carts.
///
/// Mutations consult the ledger with `peek` only; nothing is reserved until
/// checkout. Conflicting writes to one cart (two tabs adding at once) are
/// re-decided according to the retry policy.
///
/// Each buyer's cart also has a lock. Mutations take it for their duration,
/// and checkout holds it from reading the cart until the cart is checked
/// out, so one cart is never committed twice at once.
pub struct CartService<S, L, C>
where
    S: EventStore,
    L: StockLedger,
    C: Catalog,
{
    handler: CommandHandler<S, Cart>,
    ledger: L,
    catalog: C,
    retry: RetryPolicy,
    locks: Mutex<HashMap<BuyerId, Arc<Mutex<()>>>>,
}

impl<S, L, C> CartService<S, L, C>
where
    S: EventStore,
    L: StockLedger,
    C: Catalog,
{
    pub fn new(store: S, ledger: L, catalog: C) -> Self {
        Self {
            handler: CommandHandler::new(store),
            ledger,
            catalog,
            retry: RetryPolicy::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn handler(&self) -> &CommandHandler<S, Cart> {
        &self.handler
    }

    /// Waits for exclusive use of the buyer's cart.
    ///
    /// Released when the guard drops. Not reentrant: a holder must not call
    /// the mutating methods of this service for the same buyer.
    pub async fn lock_cart(&self, buyer_id: BuyerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(buyer_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Adds units to the buyer's cart, opening it on first use.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(&self, cmd: AddLine) -> Result<CommandResult<Cart>, DomainError> {
        let available = self.advisory_level(&cmd.sku).await?;

        let _guard = self.lock_cart(cmd.buyer_id).await;
        self.handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |cart| {
                cart.add_line(cmd.buyer_id, cmd.sku.clone(), cmd.quantity, available)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_line(&self, cmd: UpdateLine) -> Result<CommandResult<Cart>, DomainError> {
        let available = self.advisory_level(&cmd.sku).await?;

        let _guard = self.lock_cart(cmd.buyer_id).await;
        self.handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |cart| {
                cart.update_line(cmd.sku.clone(), cmd.quantity, available)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, cmd: RemoveLine) -> Result<CommandResult<Cart>, DomainError> {
        let _guard = self.lock_cart(cmd.buyer_id).await;
        self.handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |cart| {
                cart.remove_line(cmd.sku.clone())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, cmd: ClearCart) -> Result<CommandResult<Cart>, DomainError> {
        let _guard = self.lock_cart(cmd.buyer_id).await;
        self.handler
            .execute_with_retry(cmd.aggregate_id(), self.retry, |cart| cart.clear())
            .await
    }

    /// The buyer's cart; an unopened default cart if they never added
    /// anything.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, buyer_id: BuyerId) -> Result<Cart, DomainError> {
        self.handler.load(buyer_id.into()).await
    }

    /// The buyer's cart priced from the catalog.
    ///
    /// A line whose SKU vanished from the catalog or ledger fails the whole
    /// view rather than being dropped from the total.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, buyer_id: BuyerId) -> Result<CartView, DomainError> {
        let cart = self.get_cart(buyer_id).await?;
        if cart.is_empty() {
            return Ok(CartView::empty(buyer_id));
        }

        let mut lines = Vec::with_capacity(cart.line_count());
        for (sku, quantity) in cart.lines() {
            let entry = self.catalog.lookup(sku).await.inspect_err(|e| {
                tracing::error!(%sku, error = %e, "cart line has no catalog entry");
            })?;
            let available = self.ledger.peek(sku).await?;
            let amount = entry
                .unit_price
                .checked_times(quantity)
                .ok_or(CartError::AmountOverflow)?;
            lines.push(CartLineView {
                sku: sku.clone(),
                name: entry.name,
                quantity,
                unit_price: entry.unit_price,
                amount,
                available,
            });
        }

        Ok(CartView::from_lines(buyer_id, lines)?)
    }

    /// Marks the cart as converted into `order_id`.
    ///
    /// Single attempt: if the cart moved on since `reserved` was taken, the
    /// result is `CartError::ChangedDuringCheckout`. The caller is expected
    /// to hold [`lock_cart`](Self::lock_cart) for this buyer.
    #[tracing::instrument(skip(self, reserved))]
    pub async fn check_out(
        &self,
        buyer_id: BuyerId,
        order_id: OrderId,
        reserved: &[StockLine],
    ) -> Result<CommandResult<Cart>, DomainError> {
        let result = self
            .handler
            .execute(buyer_id.into(), |cart| cart.check_out(order_id, reserved))
            .await;

        match result {
            Err(e) if e.is_conflict() => Err(CartError::ChangedDuringCheckout.into()),
            other => other,
        }
    }

    async fn advisory_level(&self, sku: &Sku) -> Result<u32, DomainError> {
        match self.ledger.peek(sku).await {
            Ok(level) => Ok(level),
            Err(LedgerError::UnknownSku(sku)) => Err(CartError::UnknownProduct { sku }.into()),
            Err(e) => Err(e.into()),
        }
    }
}
