//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{EventEnvelope, EventStore, ExpectedVersion, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// How many times a command is re-decided after losing an append race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than 1.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// A single attempt; conflicts surface immediately.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }

    fn should_retry(&self, attempt: u32, error: &DomainError) -> bool {
        attempt < self.max_attempts && error.is_conflict()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Loads aggregates from their streams and appends the events commands
/// produce, guarded by the version the aggregate was loaded at.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for CommandHandler<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays an aggregate from its stream.
    ///
    /// Returns a default instance if the stream is empty.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.read_stream(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in events {
            if envelope.stream_type != A::aggregate_type() {
                return Err(DomainError::StreamTypeMismatch {
                    stream_id: aggregate_id,
                    expected: A::aggregate_type(),
                    found: envelope.stream_type,
                });
            }
            let event: A::Event = envelope.decode()?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    ///
    /// A stream that belongs to another aggregate type counts as missing.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = match self.load(aggregate_id).await {
            Ok(aggregate) => aggregate,
            Err(DomainError::StreamTypeMismatch { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Loads the aggregate, runs the command against it and persists the
    /// resulting events.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        let events = command_fn(&aggregate)?;
        self.commit(aggregate_id, aggregate, events).await
    }

    /// Like [`execute`](Self::execute), but re-loads and re-decides when
    /// the append loses a race with another writer of the same stream.
    pub async fn execute_with_retry<F>(
        &self,
        aggregate_id: AggregateId,
        policy: RetryPolicy,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.execute(aggregate_id, &command_fn).await {
                Err(e) if policy.should_retry(attempt, &e) => {
                    tracing::debug!(
                        %aggregate_id,
                        aggregate_type = A::aggregate_type(),
                        attempt,
                        "append conflict, retrying command"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Appends `events` on top of an aggregate the caller already loaded.
    ///
    /// The append expects the stream to still be at `aggregate.version()`.
    pub async fn commit(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<CommandResult<A>, DomainError> {
        let current_version = aggregate.version();

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(
                aggregate_id,
                ExpectedVersion::at(current_version),
                envelopes,
            )
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            envelopes.push(EventEnvelope::encode(
                aggregate_id,
                A::aggregate_type(),
                event.event_type(),
                version,
                event,
            )?);
        }

        Ok(envelopes)
    }
}
