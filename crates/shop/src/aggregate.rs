//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::EventEnvelope;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::EventDecodeError;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the kind discriminator used for storage and filtering.
    fn event_type(&self) -> &'static str;

    /// Returns the identity of the aggregate the event belongs to.
    fn aggregate_id(&self) -> AggregateId;

    /// Returns when the event happened.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Decodes a stored envelope, rejecting kinds this type does not know.
    fn from_envelope(envelope: &EventEnvelope) -> Result<Self, EventDecodeError>;
}

/// Trait for event-sourced aggregates.
///
/// An aggregate is an immutable value: commands consume it and hand back a
/// new value carrying any newly recorded events. Those events stay in an
/// uncommitted buffer until the persistence layer has stored them and calls
/// [`Aggregate::mark_committed`].
pub trait Aggregate: Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync + From<EventDecodeError>;

    /// Returns the aggregate type name used to tag stored streams.
    fn aggregate_type() -> &'static str;

    /// Creates an aggregate with the given identity and no history.
    fn new(id: AggregateId) -> Self;

    fn id(&self) -> AggregateId;

    /// Rebuilds an aggregate by replaying committed events in order.
    ///
    /// Replayed events are never recorded as uncommitted.
    fn from_history(
        id: AggregateId,
        history: impl IntoIterator<Item = Self::Event>,
    ) -> Result<Self, Self::Error>;

    /// Events recorded since the last commit, in the order they were recorded.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Returns the same aggregate with an empty uncommitted buffer.
    fn mark_committed(self) -> Self;
}
