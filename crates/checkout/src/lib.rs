//! Checkout: committing a cart to an order.
//!
//! [`ReservationCoordinator::commit`] reserves stock for every cart line in
//! one all-or-nothing step, materializes the order with captured prices and
//! converts the cart, compensating if any step after the reservation fails.

pub mod coordinator;
pub mod error;

pub use coordinator::{CART_CHANGED_REASON, ReservationCoordinator};
pub use error::{CommitError, Result, UnavailableLine};
