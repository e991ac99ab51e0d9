//! Shared types for the shop event-sourcing workspace.

mod types;

pub use types::{AggregateId, ParseAggregateIdError};
