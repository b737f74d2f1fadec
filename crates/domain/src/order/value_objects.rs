//! Value objects for the order domain.

use common::{Money, Sku};
use inventory::StockLine;
use serde::{Deserialize, Serialize};

/// A committed order line.
///
/// Name and unit price are copies taken at checkout, so later catalog
/// changes never alter a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: Sku,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(
        sku: impl Into<Sku>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// `unit_price * quantity`.
    pub fn amount(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// The stock this line holds.
    pub fn stock_line(&self) -> StockLine {
        StockLine::new(self.sku.clone(), self.quantity)
    }
}
