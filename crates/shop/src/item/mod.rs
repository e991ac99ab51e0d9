//! Shop item aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod money;
mod service;
mod state;

pub use aggregate::ShopItem;
pub use commands::{BuyItem, MarkPaymentTimeout, PayItem};
pub use events::{ItemBoughtData, ItemPaidData, ItemPaymentTimeoutData, ShopItemEvent};
pub use money::{Money, ParseMoneyError};
pub use service::{OverdueSweep, ShopItemService};
pub use state::ShopItemState;

use common::AggregateId;
use thiserror::Error;

use crate::error::EventDecodeError;

/// Errors raised by shop item commands and replay.
///
/// Redundant commands (buying twice, paying twice, timing out twice) are not
/// errors; they succeed without recording anything.
#[derive(Debug, Error)]
pub enum ShopItemError {
    /// Malformed command input or unusable history.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The command is forbidden in the item's current state.
    #[error("Illegal state for item {item_id}: {reason}")]
    IllegalState {
        item_id: AggregateId,
        reason: &'static str,
    },
}

impl From<EventDecodeError> for ShopItemError {
    fn from(e: EventDecodeError) -> Self {
        ShopItemError::InvalidArgument {
            reason: e.to_string(),
        }
    }
}
