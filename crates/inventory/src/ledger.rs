use async_trait::async_trait;
use common::Sku;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// A quantity of one SKU, the unit of every ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockLine {
    pub sku: Sku,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// One line that could not be satisfied by a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub sku: Sku,
    pub available: u32,
    pub requested: u32,
}

/// Identifier of a successful reservation, recorded on the order it funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proof that stock was decremented for `lines`.
///
/// The lines are normalized: one entry per SKU, sorted by SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationToken {
    pub reservation_id: ReservationId,
    pub lines: Vec<StockLine>,
}

impl ReservationToken {
    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// Sole authority over per-SKU available quantity.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Current available quantity. Advisory only: it may be stale by the
    /// time a reservation runs.
    async fn peek(&self, sku: &Sku) -> Result<u32, LedgerError>;

    /// Decrements every line if and only if every line is satisfiable.
    ///
    /// Lines for the same SKU are summed before checking. On
    /// `InsufficientStock` no quantity has changed.
    async fn reserve_all(&self, lines: &[StockLine]) -> Result<ReservationToken, LedgerError>;

    /// Adds every line back. Callers guarantee each reservation is released
    /// at most once.
    async fn release(&self, lines: &[StockLine]) -> Result<(), LedgerError>;
}
