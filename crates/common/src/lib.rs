//! Shared value types for the cart and order core.
//!
//! Identifiers are UUID newtypes so a buyer id can never be passed where an
//! order id is expected. `Sku` and `Money` are shared by the inventory and
//! domain crates.

pub mod ids;
pub mod money;
pub mod sku;

pub use ids::{AggregateId, BuyerId, ContactId, OrderId};
pub use money::Money;
pub use sku::Sku;
