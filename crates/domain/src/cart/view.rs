//! Read model of a cart for display.

use common::{BuyerId, Money, Sku};
use serde::Serialize;

use super::CartError;

/// One cart line priced at the catalog's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub sku: Sku,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub amount: Money,

    /// Advisory stock level at the time the view was built.
    pub available: u32,
}

/// A buyer's cart with live prices and totals.
///
/// Prices here are not captured anywhere; an order records its own copy at
/// checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub buyer_id: BuyerId,
    pub lines: Vec<CartLineView>,
    pub total_units: u64,
    pub total: Money,
}

impl CartView {
    pub fn empty(buyer_id: BuyerId) -> Self {
        Self {
            buyer_id,
            lines: Vec::new(),
            total_units: 0,
            total: Money::ZERO,
        }
    }

    /// Fails with `AmountOverflow` if the line amounts do not sum.
    pub fn from_lines(buyer_id: BuyerId, lines: Vec<CartLineView>) -> Result<Self, CartError> {
        let total =
            Money::checked_sum(lines.iter().map(|l| l.amount)).ok_or(CartError::AmountOverflow)?;
        Ok(Self {
            buyer_id,
            total_units: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            total,
            lines,
        })
    }
}
