use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{EventStore, ExpectedVersion, validate_batch};
use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

#[derive(Default)]
struct Log {
    /// Every event in append order.
    events: Vec<EventEnvelope>,
    /// Per-stream indices into `events`.
    streams: HashMap<AggregateId, Vec<usize>>,
}

impl Log {
    fn version_of(&self, stream_id: AggregateId) -> Version {
        self.streams
            .get(&stream_id)
            .and_then(|idx| idx.last())
            .and_then(|&i| self.events.get(i))
            .map_or(Version::initial(), |e| e.version)
    }
}

/// Event store held entirely in memory.
///
/// Cloning shares the same log, so a store can be handed to several
/// services.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        stream_id: AggregateId,
        expected: ExpectedVersion,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        let mut log = self.log.write().await;

        let current = log.version_of(stream_id);
        if !expected.is_satisfied_by(current) {
            tracing::debug!(%stream_id, %expected, %current, "append rejected");
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual: current,
            });
        }
        validate_batch(stream_id, current, &events)?;

        let mut new_version = current;
        for event in events {
            new_version = event.version;
            let index = log.events.len();
            log.events.push(event);
            log.streams.entry(stream_id).or_default().push(index);
        }

        Ok(new_version)
    }

    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        let events = log
            .streams
            .get(&stream_id)
            .map(|idx| {
                idx.iter()
                    .filter_map(|&i| log.events.get(i).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn stream_version(&self, stream_id: AggregateId) -> Result<Version> {
        Ok(self.log.read().await.version_of(stream_id))
    }

    async fn events_of_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(stream_id: AggregateId, version: u64, event_type: &str) -> EventEnvelope {
        EventEnvelope::encode(stream_id, "Test", event_type, Version::new(version), &version)
            .unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(
                id,
                ExpectedVersion::NoStream,
                vec![envelope(id, 1, "A"), envelope(id, 2, "B")],
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
        let events = store.read_stream(id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "A");
        assert_eq!(events[1].event_type, "B");
        assert_eq!(store.stream_version(id).await.unwrap(), Version::new(2));
    }

    #[tokio::test]
    async fn unknown_stream_is_empty_at_initial_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        assert!(store.read_stream(id).await.unwrap().is_empty());
        assert_eq!(store.stream_version(id).await.unwrap(), Version::initial());
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(id, ExpectedVersion::NoStream, vec![envelope(id, 1, "A")])
            .await
            .unwrap();

        let result = store
            .append(id, ExpectedVersion::NoStream, vec![envelope(id, 1, "A")])
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn only_one_of_two_racing_appends_wins() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(id, ExpectedVersion::NoStream, vec![envelope(id, 1, "A")])
            .await
            .unwrap();

        let expected = ExpectedVersion::Exact(Version::first());
        let (a, b) = tokio::join!(
            store.append(id, expected, vec![envelope(id, 2, "B")]),
            store.append(id, expected, vec![envelope(id, 2, "C")]),
        );

        assert!(a.is_ok() != b.is_ok());
        assert_eq!(store.stream_version(id).await.unwrap(), Version::new(2));
    }

    #[tokio::test]
    async fn events_of_type_spans_streams_in_append_order() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let second = AggregateId::new();
        store
            .append(first, ExpectedVersion::Any, vec![envelope(first, 1, "Placed")])
            .await
            .unwrap();
        store
            .append(second, ExpectedVersion::Any, vec![envelope(second, 1, "Placed")])
            .await
            .unwrap();
        store
            .append(first, ExpectedVersion::Any, vec![envelope(first, 2, "Other")])
            .await
            .unwrap();

        let placed = store.events_of_type("Placed").await.unwrap();
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].stream_id, first);
        assert_eq!(placed[1].stream_id, second);
    }
}
