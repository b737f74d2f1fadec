use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Precondition on the stream's version checked atomically with an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// No check. Only for streams with a single writer.
    Any,
    /// The stream must not have any events yet.
    NoStream,
    /// The stream must be exactly at this version.
    Exact(Version),
}

impl ExpectedVersion {
    /// Expectation matching a stream the caller loaded at `version`.
    pub fn at(version: Version) -> Self {
        if version == Version::initial() {
            Self::NoStream
        } else {
            Self::Exact(version)
        }
    }

    pub fn is_satisfied_by(&self, current: Version) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => current == Version::initial(),
            ExpectedVersion::Exact(v) => *v == current,
        }
    }
}

impl std::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedVersion::Any => f.write_str("any version"),
            ExpectedVersion::NoStream => f.write_str("no stream"),
            ExpectedVersion::Exact(v) => write!(f, "version {v}"),
        }
    }
}

/// Storage for event streams.
///
/// Implementations must make `append` atomic per stream: the version check
/// and the write happen under the same lock or transaction.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` to `stream_id` if `expected` holds.
    ///
    /// Returns the stream version after the append.
    async fn append(
        &self,
        stream_id: AggregateId,
        expected: ExpectedVersion,
        events: Vec<EventEnvelope>,
    ) -> Result<Version>;

    /// All events of one stream, oldest first. Empty for unknown streams.
    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Current version of a stream, `Version::initial()` if it has no events.
    async fn stream_version(&self, stream_id: AggregateId) -> Result<Version>;

    /// Every event with the given type across all streams, in append order.
    async fn events_of_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;
}

/// Checks that a batch targets `stream_id` and continues from `current`
/// without gaps.
pub fn validate_batch(
    stream_id: AggregateId,
    current: Version,
    events: &[EventEnvelope],
) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidBatch(
            "cannot append an empty batch".to_string(),
        ));
    }

    let mut expected = current;
    for event in events {
        if event.stream_id != stream_id {
            return Err(EventStoreError::InvalidBatch(format!(
                "event {} belongs to stream {}, not {stream_id}",
                event.event_id, event.stream_id
            )));
        }
        expected = expected.next();
        if event.version != expected {
            return Err(EventStoreError::InvalidBatch(format!(
                "expected version {expected}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
