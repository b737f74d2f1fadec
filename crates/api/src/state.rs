//! Shared application state.

use checkout::ReservationCoordinator;
use domain::{CartService, OrderService};
use event_store::EventStore;
use inventory::{InMemoryCatalog, InMemoryStockLedger};

/// Checkout coordinator over in-memory stock and catalog collaborators.
pub type Coordinator<S> = ReservationCoordinator<S, InMemoryStockLedger, InMemoryCatalog>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub coordinator: Coordinator<S>,
    pub ledger: InMemoryStockLedger,
    pub catalog: InMemoryCatalog,
}

impl<S: EventStore> AppState<S> {
    pub fn carts(&self) -> &CartService<S, InMemoryStockLedger, InMemoryCatalog> {
        self.coordinator.carts()
    }

    pub fn orders(&self) -> &OrderService<S, InMemoryStockLedger> {
        self.coordinator.orders()
    }
}
