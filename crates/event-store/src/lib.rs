//! Append-only event log.
//!
//! Every cart and every order is one stream of events keyed by
//! [`AggregateId`]. Appends are checked against an [`ExpectedVersion`], which
//! is the only concurrency control the domain layer needs for per-aggregate
//! isolation.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{EventStore, ExpectedVersion};
