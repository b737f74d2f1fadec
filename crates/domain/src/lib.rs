//! Domain layer for carts and orders.
//!
//! - [`Aggregate`] and [`DomainEvent`] traits for event-sourced entities
//! - [`CommandHandler`] with optimistic concurrency and [`RetryPolicy`]
//! - [`Cart`] aggregate and [`CartService`]
//! - [`Order`] aggregate, the [`OrderState`] machine and [`OrderService`]
//! - [`OrderNotifier`] port for state-change notifications

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod error;
pub mod notify;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{
    AddLine, Cart, CartError, CartEvent, CartLineView, CartService, CartView, ClearCart,
    RemoveLine, UpdateLine,
};
pub use command::{Command, CommandHandler, CommandResult, RetryPolicy};
pub use error::DomainError;
pub use notify::{InMemoryNotifier, OrderNotification, OrderNotifier, TracingNotifier};
pub use order::{
    CancelOrder, Cancellation, Order, OrderError, OrderEvent, OrderLine, OrderService,
    OrderState, PlaceOrder, TransitionOrder, TransitionRejection,
};
