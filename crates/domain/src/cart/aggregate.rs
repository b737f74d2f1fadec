//! Cart aggregate implementation.

use std::collections::BTreeMap;

use common::{AggregateId, BuyerId, OrderId, Sku};
use event_store::Version;
use inventory::StockLine;

use crate::aggregate::Aggregate;

use super::{CartError, CartEvent};

/// A buyer's draft selection of SKUs.
///
/// Holds at most one line per SKU. The cart is opened lazily by the first
/// addition and is never deleted: checking out empties it, ready for the
/// next purchase.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    id: Option<AggregateId>,
    version: Version,
    buyer_id: Option<BuyerId>,
    lines: BTreeMap<Sku, u32>,
    last_order: Option<OrderId>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CartEvent::CartOpened(data) => {
                self.id = Some(data.cart_id);
                self.buyer_id = Some(data.buyer_id);
            }
            CartEvent::LineAdded(data) => {
                *self.lines.entry(data.sku).or_insert(0) += data.quantity;
            }
            CartEvent::LineQuantityChanged(data) => {
                self.lines.insert(data.sku, data.new_quantity);
            }
            CartEvent::LineRemoved(data) => {
                self.lines.remove(&data.sku);
            }
            CartEvent::CartCleared(_) => self.lines.clear(),
            CartEvent::CartCheckedOut(data) => {
                self.lines.clear();
                self.last_order = Some(data.order_id);
            }
        }
    }
}

// Query methods
impl Cart {
    pub fn buyer_id(&self) -> Option<BuyerId> {
        self.buyer_id
    }

    /// Quantity of a SKU, if the cart holds a line for it.
    pub fn quantity_of(&self, sku: &Sku) -> Option<u32> {
        self.lines.get(sku).copied()
    }

    /// Lines in SKU order.
    pub fn lines(&self) -> impl Iterator<Item = (&Sku, u32)> {
        self.lines.iter().map(|(sku, quantity)| (sku, *quantity))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_units(&self) -> u64 {
        self.lines.values().map(|q| u64::from(*q)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The order this cart was last checked out into.
    pub fn last_order(&self) -> Option<OrderId> {
        self.last_order
    }

    /// The lines as (SKU, quantity) pairs, sorted by SKU.
    ///
    /// The aggregate is an immutable value once loaded, so the snapshot is
    /// always a single point in time.
    pub fn snapshot(&self) -> Vec<StockLine> {
        self.lines
            .iter()
            .map(|(sku, quantity)| StockLine::new(sku.clone(), *quantity))
            .collect()
    }
}

// Command methods (return events)
impl Cart {
    /// Adds `quantity` units of `sku`, opening the cart if needed.
    ///
    /// `available` is the ledger's advisory level for the SKU; the combined
    /// line quantity may not exceed it.
    pub fn add_line(
        &self,
        buyer_id: BuyerId,
        sku: Sku,
        quantity: u32,
        available: u32,
    ) -> Result<Vec<CartEvent>, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { sku, quantity });
        }

        let existing = self.quantity_of(&sku).unwrap_or(0);
        let requested = existing
            .checked_add(quantity)
            .ok_or_else(|| CartError::QuantityOverflow { sku: sku.clone() })?;
        if requested > available {
            return Err(CartError::InsufficientStock {
                sku,
                available,
                requested,
            });
        }

        let mut events = Vec::with_capacity(2);
        if self.id.is_none() {
            events.push(CartEvent::cart_opened(buyer_id.into(), buyer_id));
        }
        events.push(CartEvent::line_added(sku, quantity));
        Ok(events)
    }

    /// Sets the quantity of an existing line.
    pub fn update_line(
        &self,
        sku: Sku,
        new_quantity: u32,
        available: u32,
    ) -> Result<Vec<CartEvent>, CartError> {
        if new_quantity == 0 {
            return Err(CartError::InvalidQuantity {
                sku,
                quantity: new_quantity,
            });
        }

        let Some(old_quantity) = self.quantity_of(&sku) else {
            return Err(CartError::LineNotFound { sku });
        };

        if new_quantity == old_quantity {
            return Ok(vec![]);
        }

        if new_quantity > available {
            return Err(CartError::InsufficientStock {
                sku,
                available,
                requested: new_quantity,
            });
        }

        Ok(vec![CartEvent::line_quantity_changed(
            sku,
            old_quantity,
            new_quantity,
        )])
    }

    pub fn remove_line(&self, sku: Sku) -> Result<Vec<CartEvent>, CartError> {
        if !self.lines.contains_key(&sku) {
            return Err(CartError::LineNotFound { sku });
        }
        Ok(vec![CartEvent::line_removed(sku)])
    }

    /// Drops every line. Clearing an empty cart is a no-op.
    pub fn clear(&self) -> Result<Vec<CartEvent>, CartError> {
        if self.lines.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::cart_cleared()])
    }

    /// Converts the cart into `order_id`.
    ///
    /// Fails unless the cart still holds exactly the `reserved` lines, so a
    /// cart edited after the snapshot was taken, or already checked out by a
    /// concurrent submission, is never committed.
    pub fn check_out(
        &self,
        order_id: OrderId,
        reserved: &[StockLine],
    ) -> Result<Vec<CartEvent>, CartError> {
        if self.lines.is_empty() && reserved.is_empty() {
            return Err(CartError::EmptyCart);
        }
        if self.snapshot() != reserved {
            return Err(CartError::ChangedDuringCheckout);
        }
        Ok(vec![CartEvent::cart_checked_out(order_id)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn cart_with(lines: &[(&str, u32)]) -> (Cart, BuyerId) {
        let buyer = BuyerId::new();
        let mut cart = Cart::default();
        for (sku, quantity) in lines {
            let events = cart
                .add_line(buyer, Sku::new(*sku), *quantity, u32::MAX)
                .unwrap();
            cart.apply_events(events);
        }
        (cart, buyer)
    }

    #[test]
    fn first_addition_opens_the_cart() {
        let buyer = BuyerId::new();
        let events = Cart::default()
            .add_line(buyer, Sku::new("X"), 3, 5)
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "CartOpened");

        let mut cart = Cart::default();
        cart.apply_events(events);
        assert_eq!(cart.id(), Some(AggregateId::from(buyer)));
        assert_eq!(cart.buyer_id(), Some(buyer));
        assert_eq!(cart.quantity_of(&Sku::new("X")), Some(3));
    }

    #[test]
    fn repeated_additions_increment_one_line() {
        let (mut cart, buyer) = cart_with(&[("X", 2)]);
        let events = cart.add_line(buyer, Sku::new("X"), 3, 10).unwrap();
        assert_eq!(events.len(), 1);
        cart.apply_events(events);

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.quantity_of(&Sku::new("X")), Some(5));
    }

    #[test]
    fn add_rejects_zero_quantity() {
        let result = Cart::default().add_line(BuyerId::new(), Sku::new("X"), 0, 10);
        assert!(matches!(
            result,
            Err(CartError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn add_soft_check_counts_existing_units() {
        let (cart, buyer) = cart_with(&[("X", 3)]);
        let result = cart.add_line(buyer, Sku::new("X"), 3, 5);
        assert_eq!(
            result.unwrap_err(),
            CartError::InsufficientStock {
                sku: Sku::new("X"),
                available: 5,
                requested: 6,
            }
        );
    }

    #[test]
    fn update_requires_existing_line_and_positive_quantity() {
        let (cart, _) = cart_with(&[("X", 1)]);

        assert!(matches!(
            cart.update_line(Sku::new("Y"), 2, 10),
            Err(CartError::LineNotFound { .. })
        ));
        assert!(matches!(
            cart.update_line(Sku::new("X"), 0, 10),
            Err(CartError::InvalidQuantity { .. })
        ));
        assert!(cart.update_line(Sku::new("X"), 1, 10).unwrap().is_empty());
    }

    #[test]
    fn update_changes_quantity() {
        let (mut cart, _) = cart_with(&[("X", 1)]);
        let events = cart.update_line(Sku::new("X"), 4, 10).unwrap();
        cart.apply_events(events);
        assert_eq!(cart.quantity_of(&Sku::new("X")), Some(4));
    }

    #[test]
    fn removing_last_line_leaves_an_open_empty_cart() {
        let (mut cart, _) = cart_with(&[("X", 1)]);
        let events = cart.remove_line(Sku::new("X")).unwrap();
        cart.apply_events(events);

        assert!(cart.is_empty());
        assert!(cart.id().is_some());
        assert!(matches!(
            cart.remove_line(Sku::new("X")),
            Err(CartError::LineNotFound { .. })
        ));
    }

    #[test]
    fn clear_drops_all_lines() {
        let (mut cart, _) = cart_with(&[("X", 1), ("Y", 2)]);
        let events = cart.clear().unwrap();
        cart.apply_events(events);

        assert!(cart.is_empty());
        assert!(cart.id().is_some());
        assert!(cart.clear().unwrap().is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_sku() {
        let (cart, _) = cart_with(&[("B", 1), ("A", 2), ("C", 3)]);
        let skus: Vec<_> = cart
            .snapshot()
            .into_iter()
            .map(|l| l.sku.as_str().to_string())
            .collect();
        assert_eq!(skus, ["A", "B", "C"]);
        assert_eq!(cart.total_units(), 6);
    }

    #[test]
    fn check_out_empties_the_cart() {
        let (mut cart, _) = cart_with(&[("X", 2)]);
        let snapshot = cart.snapshot();
        let order_id = OrderId::new();

        let events = cart.check_out(order_id, &snapshot).unwrap();
        cart.apply_events(events);

        assert!(cart.is_empty());
        assert_eq!(cart.last_order(), Some(order_id));
    }

    #[test]
    fn check_out_rejects_a_changed_cart() {
        let (mut cart, buyer) = cart_with(&[("X", 2)]);
        let snapshot = cart.snapshot();
        let events = cart.add_line(buyer, Sku::new("Y"), 1, 10).unwrap();
        cart.apply_events(events);

        assert_eq!(
            cart.check_out(OrderId::new(), &snapshot).unwrap_err(),
            CartError::ChangedDuringCheckout
        );
    }

    #[test]
    fn second_check_out_of_same_snapshot_fails() {
        let (mut cart, _) = cart_with(&[("X", 2)]);
        let snapshot = cart.snapshot();
        let events = cart.check_out(OrderId::new(), &snapshot).unwrap();
        cart.apply_events(events);

        assert_eq!(
            cart.check_out(OrderId::new(), &snapshot).unwrap_err(),
            CartError::ChangedDuringCheckout
        );
    }

    #[test]
    fn check_out_of_empty_cart_fails() {
        assert_eq!(
            Cart::default().check_out(OrderId::new(), &[]).unwrap_err(),
            CartError::EmptyCart
        );
    }
}
