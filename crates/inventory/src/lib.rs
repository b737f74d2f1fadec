//! Stock and catalog collaborators of the cart and order core.
//!
//! The [`StockLedger`] is the only writer of a SKU's available quantity. It
//! reserves multi-line batches all-or-nothing and releases them on
//! cancellation. The [`Catalog`] is a read-only port for prices and display
//! names.

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod memory;

pub use catalog::{Catalog, CatalogEntry, InMemoryCatalog, ProductOffering};
pub use error::{CatalogError, LedgerError};
pub use ledger::{ReservationId, ReservationToken, Shortage, StockLedger, StockLine};
pub use memory::InMemoryStockLedger;
