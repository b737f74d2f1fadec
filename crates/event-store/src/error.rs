use thiserror::Error;

use crate::{AggregateId, ExpectedVersion, Version};

/// Errors raised by event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream moved on since the caller loaded it.
    #[error(
        "Concurrency conflict on stream {stream_id}: expected {expected}, found version {actual}"
    )]
    ConcurrencyConflict {
        stream_id: AggregateId,
        expected: ExpectedVersion,
        actual: Version,
    },

    /// The batch handed to `append` is malformed.
    #[error("Invalid append batch: {0}")]
    InvalidBatch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true for errors that go away by reloading and retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
