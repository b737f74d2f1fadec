//! In-memory stock ledger with one mutex per SKU.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::Sku;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::catalog::ProductOffering;
use crate::error::LedgerError;
use crate::ledger::{ReservationId, ReservationToken, Shortage, StockLedger, StockLine};

type Cell = Arc<Mutex<u32>>;

/// A locked SKU together with the quantity a batch wants to move.
struct Held {
    sku: Sku,
    quantity: u32,
    level: OwnedMutexGuard<u32>,
}

/// Stock ledger kept in memory.
///
/// Each SKU's quantity sits behind its own mutex. A batch locks every SKU it
/// touches in ascending SKU order and holds all of them while it checks and
/// writes, so two batches over overlapping SKU sets serialize without
/// deadlocking and a batch never observes another batch half-applied.
///
/// The outer map lock only guards the set of SKUs, never a quantity.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    cells: Arc<RwLock<HashMap<Sku, Cell>>>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger holding each offering's available quantity.
    pub fn from_offerings<'a>(offerings: impl IntoIterator<Item = &'a ProductOffering>) -> Self {
        let cells = offerings
            .into_iter()
            .map(|o| (o.sku.clone(), Arc::new(Mutex::new(o.available_quantity))))
            .collect();
        Self {
            cells: Arc::new(RwLock::new(cells)),
        }
    }

    /// Sets the absolute stock level of a SKU, registering it if new.
    ///
    /// This is the ingestion path for price lists; it is not used by the
    /// checkout flow.
    pub async fn set_quantity(&self, sku: impl Into<Sku>, quantity: u32) {
        let sku = sku.into();
        let existing = self.cells.read().await.get(&sku).cloned();
        match existing {
            Some(cell) => *cell.lock().await = quantity,
            None => {
                let mut cells = self.cells.write().await;
                let cell = cells.entry(sku).or_default();
                *cell.lock().await = quantity;
            }
        }
    }

    /// Adds incoming stock to a SKU, registering it if new. Returns the new
    /// level.
    pub async fn restock(&self, sku: impl Into<Sku>, quantity: u32) -> Result<u32, LedgerError> {
        let sku = sku.into();
        let cell = {
            let mut cells = self.cells.write().await;
            cells.entry(sku.clone()).or_default().clone()
        };
        let mut level = cell.lock().await;
        *level = level
            .checked_add(quantity)
            .ok_or(LedgerError::QuantityOverflow { sku })?;
        Ok(*level)
    }

    /// Locks every SKU of `wanted` in ascending order.
    ///
    /// Fails with `UnknownSku` before taking any per-SKU lock.
    async fn lock_in_order(&self, wanted: BTreeMap<Sku, u32>) -> Result<Vec<Held>, LedgerError> {
        let handles = {
            let cells = self.cells.read().await;
            let mut handles = Vec::with_capacity(wanted.len());
            for (sku, quantity) in wanted {
                let Some(cell) = cells.get(&sku) else {
                    tracing::error!(%sku, "stock ledger has no entry for SKU");
                    return Err(LedgerError::UnknownSku(sku));
                };
                handles.push((sku, quantity, Arc::clone(cell)));
            }
            handles
        };

        let mut held = Vec::with_capacity(handles.len());
        for (sku, quantity, cell) in handles {
            let level = cell.lock_owned().await;
            held.push(Held {
                sku,
                quantity,
                level,
            });
        }
        Ok(held)
    }
}

/// Sums lines per SKU in canonical order, rejecting zero quantities.
fn normalize(lines: &[StockLine]) -> Result<BTreeMap<Sku, u32>, LedgerError> {
    let mut wanted: BTreeMap<Sku, u32> = BTreeMap::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(LedgerError::InvalidQuantity {
                sku: line.sku.clone(),
                quantity: 0,
            });
        }
        let total = wanted.entry(line.sku.clone()).or_insert(0);
        *total = total
            .checked_add(line.quantity)
            .ok_or_else(|| LedgerError::QuantityOverflow {
                sku: line.sku.clone(),
            })?;
    }
    Ok(wanted)
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn peek(&self, sku: &Sku) -> Result<u32, LedgerError> {
        let cell = self
            .cells
            .read()
            .await
            .get(sku)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownSku(sku.clone()))?;
        let level = *cell.lock().await;
        Ok(level)
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn reserve_all(&self, lines: &[StockLine]) -> Result<ReservationToken, LedgerError> {
        let wanted = normalize(lines)?;
        let mut held = self.lock_in_order(wanted).await?;

        let shortages: Vec<Shortage> = held
            .iter()
            .filter(|h| *h.level < h.quantity)
            .map(|h| Shortage {
                sku: h.sku.clone(),
                available: *h.level,
                requested: h.quantity,
            })
            .collect();

        if !shortages.is_empty() {
            metrics::counter!("stock_reservations_rejected_total").increment(1);
            tracing::info!(shortages = shortages.len(), "reservation rejected");
            return Err(LedgerError::InsufficientStock { shortages });
        }

        for h in &mut held {
            *h.level -= h.quantity;
        }

        let token = ReservationToken {
            reservation_id: ReservationId::new(),
            lines: held
                .into_iter()
                .map(|h| StockLine::new(h.sku, h.quantity))
                .collect(),
        };
        metrics::counter!("stock_reservations_total").increment(1);
        tracing::debug!(reservation_id = %token.reservation_id, units = token.total_units(), "stock reserved");
        Ok(token)
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn release(&self, lines: &[StockLine]) -> Result<(), LedgerError> {
        let wanted = normalize(lines)?;
        let mut held = self.lock_in_order(wanted).await?;

        // Check every line before writing any, so a release is all-or-nothing too.
        if let Some(h) = held.iter().find(|h| h.level.checked_add(h.quantity).is_none()) {
            tracing::error!(sku = %h.sku, "release would overflow stock level");
            return Err(LedgerError::QuantityOverflow { sku: h.sku.clone() });
        }

        let mut units = 0u64;
        for h in &mut held {
            *h.level += h.quantity;
            units += u64::from(h.quantity);
        }

        metrics::counter!("stock_released_units_total").increment(units);
        tracing::debug!(units, "stock released");
        Ok(())
    }
}
