//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events are facts that already happened. They are immutable and
/// named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Event type name, stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced aggregates.
///
/// Command methods on an aggregate validate against current state and
/// return events; `apply` folds those events back into state and never
/// fails.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors its command methods return.
    type Error: std::error::Error + Send + Sync;

    /// Aggregate type name, recorded as the stream type.
    fn aggregate_type() -> &'static str;

    /// Returns None until the first event has been applied.
    fn id(&self) -> Option<AggregateId>;

    /// Version of the last applied event, `Version::initial()` when new.
    fn version(&self) -> Version;

    /// Called by the command handler after loading or appending events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate.
    ///
    /// Must be pure and deterministic. Events are facts, so this cannot
    /// fail.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
