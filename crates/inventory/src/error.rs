use common::{Money, Sku};
use thiserror::Error;

use crate::ledger::Shortage;

/// Errors raised by the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// At least one line asked for more than is available. Nothing was
    /// reserved. Every failing line is listed.
    #[error("Insufficient stock for {} line(s): {}", shortages.len(), describe(shortages))]
    InsufficientStock { shortages: Vec<Shortage> },

    /// The ledger has never heard of this SKU. This is a data-integrity
    /// fault, not a buyer mistake.
    #[error("Unknown SKU: {0}")]
    UnknownSku(Sku),

    #[error("Invalid quantity {quantity} for {sku} (must be greater than 0)")]
    InvalidQuantity { sku: Sku, quantity: u32 },

    /// Adding stock back would exceed the representable quantity.
    #[error("Stock level overflow for {sku}")]
    QuantityOverflow { sku: Sku },
}

impl LedgerError {
    /// True for faults that indicate inconsistent data rather than a
    /// recoverable conflict.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownSku(_) | LedgerError::QuantityOverflow { .. }
        )
    }
}

fn describe(shortages: &[Shortage]) -> String {
    shortages
        .iter()
        .map(|s| format!("{} (available {}, requested {})", s.sku, s.available, s.requested))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by the catalog port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown SKU: {0}")]
    UnknownSku(Sku),

    #[error("Invalid price {price} for {sku} (must be greater than 0)")]
    InvalidPrice { sku: Sku, price: Money },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_lists_every_line() {
        let err = LedgerError::InsufficientStock {
            shortages: vec![
                Shortage {
                    sku: Sku::new("A"),
                    available: 1,
                    requested: 3,
                },
                Shortage {
                    sku: Sku::new("B"),
                    available: 0,
                    requested: 2,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 2 line(s): A (available 1, requested 3), B (available 0, requested 2)"
        );
    }

    #[test]
    fn integrity_classification() {
        assert!(LedgerError::UnknownSku(Sku::new("X")).is_integrity_fault());
        assert!(!LedgerError::InsufficientStock { shortages: vec![] }.is_integrity_fault());
    }
}
