//! Shop item state machine.

use serde::{Deserialize, Serialize};

/// The state of a shop item in its lifecycle.
///
/// State transitions:
/// ```text
/// Initialized ──► Bought ──┬──────────────────► Paid
///                          │                     ▲
///                          └──► PaymentMissing ──┘ (late payment)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShopItemState {
    /// No event applied yet.
    #[default]
    Initialized,

    /// Bought, waiting for payment.
    Bought,

    /// Payment received.
    Paid,

    /// Payment deadline passed without a payment.
    PaymentMissing,
}

impl ShopItemState {
    /// Returns true if a buy command would record a purchase.
    pub fn can_buy(&self) -> bool {
        matches!(self, ShopItemState::Initialized)
    }

    /// Returns true if a pay command would record a payment.
    pub fn can_pay(&self) -> bool {
        matches!(self, ShopItemState::Bought | ShopItemState::PaymentMissing)
    }

    /// Returns true if a timeout command would record a missing payment.
    pub fn can_mark_timeout(&self) -> bool {
        matches!(self, ShopItemState::Bought)
    }

    /// Returns true once no command can change the state any more.
    ///
    /// Only `Paid` qualifies. `PaymentMissing` ends the waiting period but is
    /// not final: a late payment still moves it to `Paid`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShopItemState::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShopItemState::Initialized => "Initialized",
            ShopItemState::Bought => "Bought",
            ShopItemState::Paid => "Paid",
            ShopItemState::PaymentMissing => "PaymentMissing",
        }
    }
}

impl std::fmt::Display for ShopItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
