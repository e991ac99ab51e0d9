//! Error types shared by the command handling layer.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::item::ShopItemError;

/// Errors that can occur while loading or changing an aggregate through the
/// event store.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Shop item error: {0}")]
    ShopItem(#[from] ShopItemError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A command produced events for a different stream than the one it was
    /// executed against.
    #[error("Command on stream {stream} produced an event for {event}")]
    StreamMismatch {
        stream: AggregateId,
        event: AggregateId,
    },
}

/// A stored envelope could not be turned back into a domain event.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event type `{event_type}`")]
    UnknownEventType { event_type: String },

    #[error("malformed `{event_type}` payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope says `{envelope_type}` but payload is `{payload_type}`")]
    TypeMismatch {
        envelope_type: String,
        payload_type: &'static str,
    },
}
