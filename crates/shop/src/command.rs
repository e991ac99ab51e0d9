//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::ShopError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after the command, with its buffer already committed.
    pub aggregate: A,

    /// The events that were recorded and persisted. Empty for no-op commands.
    pub events: Vec<A::Event>,

    /// The stream version after the command.
    pub new_version: Version,
}

impl<A: Aggregate> CommandResult<A> {
    /// Returns true if the command recorded nothing.
    pub fn is_no_op(&self) -> bool {
        self.events.is_empty()
    }
}

/// Trait for commands that can be executed against an aggregate.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Runs commands against aggregates stored in an [`EventStore`].
///
/// Each execution loads the stream, replays it into the aggregate, runs the
/// command, appends whatever the command recorded and finally marks those
/// events committed on the returned aggregate. The stream version observed at
/// load time is sent as the expected version, so the store can reject a
/// writer that raced with another one.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
    ShopError: From<A::Error>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate and the version of its stream.
    ///
    /// An identity with no stored events yields a fresh aggregate at
    /// [`Version::initial`].
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<(A, Version), ShopError> {
        let envelopes = self.store.get_events_for_aggregate(aggregate_id).await?;
        let version = envelopes.last().map(|e| e.version).unwrap_or_default();

        let history = envelopes
            .iter()
            .map(A::Event::from_envelope)
            .collect::<Result<Vec<_>, _>>()
            .map_err(A::Error::from)?;

        tracing::debug!(
            %aggregate_id,
            aggregate_type = A::aggregate_type(),
            events = history.len(),
            "replaying history"
        );
        let aggregate = A::from_history(aggregate_id, history)?;
        Ok((aggregate, version))
    }

    /// Loads an aggregate, returning None if its stream is empty.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, ShopError> {
        let (aggregate, version) = self.load(aggregate_id).await?;
        Ok((version != Version::initial()).then_some(aggregate))
    }

    /// Executes a command and persists the events it recorded.
    ///
    /// The command function receives the current aggregate and returns the
    /// next one, or an error. Nothing is written when it records no events.
    #[tracing::instrument(skip(self, command_fn), fields(aggregate_type = A::aggregate_type()))]
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, ShopError>
    where
        F: FnOnce(A) -> Result<A, A::Error>,
    {
        let (aggregate, current_version) = self.load(aggregate_id).await?;
        metrics::counter!("shop_commands_total", "aggregate" => A::aggregate_type()).increment(1);

        let aggregate = command_fn(aggregate)?;
        let events = aggregate.uncommitted_events().to_vec();

        if events.is_empty() {
            metrics::counter!("shop_command_noops_total", "aggregate" => A::aggregate_type())
                .increment(1);
            tracing::debug!(%aggregate_id, version = %current_version, "command recorded no events");
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await?;

        metrics::counter!("shop_events_appended_total", "aggregate" => A::aggregate_type())
            .increment(events.len() as u64);
        tracing::info!(
            %aggregate_id,
            events = events.len(),
            version = %new_version,
            "events persisted"
        );

        Ok(CommandResult {
            aggregate: aggregate.mark_committed(),
            events,
            new_version,
        })
    }

    /// Executes a command against the aggregate it targets.
    ///
    /// Same as [`CommandHandler::execute`], with the stream taken from the
    /// command itself.
    pub async fn handle<C, F>(
        &self,
        command: &C,
        command_fn: F,
    ) -> Result<CommandResult<A>, ShopError>
    where
        C: Command<Aggregate = A>,
        F: FnOnce(A) -> Result<A, A::Error>,
    {
        self.execute(command.aggregate_id(), command_fn).await
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, ShopError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            if event.aggregate_id() != aggregate_id {
                return Err(ShopError::StreamMismatch {
                    stream: aggregate_id,
                    event: event.aggregate_id(),
                });
            }

            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .occurred_at(event.occurred_at())
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}
