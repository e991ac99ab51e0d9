//! Shop item domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::error::EventDecodeError;

use super::{Money, ShopItemError};

/// Events that can occur on a shop item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShopItemEvent {
    /// The item was bought and a payment deadline was set.
    ItemBought(ItemBoughtData),

    /// Payment for the item was received.
    ItemPaid(ItemPaidData),

    /// The payment deadline passed without a payment.
    ItemPaymentTimeout(ItemPaymentTimeoutData),
}

impl ShopItemEvent {
    /// Every kind discriminator this event type can carry.
    pub const EVENT_TYPES: [&'static str; 3] = ["ItemBought", "ItemPaid", "ItemPaymentTimeout"];

    /// Creates an ItemBought event, checking its invariants.
    pub fn item_bought(
        item_id: AggregateId,
        occurred_at: DateTime<Utc>,
        payment_timeout: DateTime<Utc>,
        price: Money,
    ) -> Result<Self, ShopItemError> {
        ItemBoughtData::new(item_id, occurred_at, payment_timeout, price).map(Self::ItemBought)
    }

    pub fn item_paid(item_id: AggregateId, occurred_at: DateTime<Utc>) -> Self {
        ShopItemEvent::ItemPaid(ItemPaidData {
            item_id,
            occurred_at,
        })
    }

    pub fn item_payment_timeout(item_id: AggregateId, occurred_at: DateTime<Utc>) -> Self {
        ShopItemEvent::ItemPaymentTimeout(ItemPaymentTimeoutData {
            item_id,
            occurred_at,
        })
    }
}

impl DomainEvent for ShopItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShopItemEvent::ItemBought(_) => "ItemBought",
            ShopItemEvent::ItemPaid(_) => "ItemPaid",
            ShopItemEvent::ItemPaymentTimeout(_) => "ItemPaymentTimeout",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            ShopItemEvent::ItemBought(data) => data.item_id,
            ShopItemEvent::ItemPaid(data) => data.item_id,
            ShopItemEvent::ItemPaymentTimeout(data) => data.item_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShopItemEvent::ItemBought(data) => data.occurred_at,
            ShopItemEvent::ItemPaid(data) => data.occurred_at,
            ShopItemEvent::ItemPaymentTimeout(data) => data.occurred_at,
        }
    }

    fn from_envelope(envelope: &EventEnvelope) -> Result<Self, EventDecodeError> {
        if !Self::EVENT_TYPES.contains(&envelope.event_type.as_str()) {
            return Err(EventDecodeError::UnknownEventType {
                event_type: envelope.event_type.clone(),
            });
        }

        let event: Self = envelope
            .decode_payload()
            .map_err(|source| EventDecodeError::Malformed {
                event_type: envelope.event_type.clone(),
                source,
            })?;

        if event.event_type() != envelope.event_type {
            return Err(EventDecodeError::TypeMismatch {
                envelope_type: envelope.event_type.clone(),
                payload_type: event.event_type(),
            });
        }

        Ok(event)
    }
}

/// Data for the ItemBought event.
///
/// Only constructible through [`ItemBoughtData::new`], and deserialization
/// goes through the same checks, so a stored purchase always has a
/// non-negative price and a deadline strictly after the purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawItemBought")]
pub struct ItemBoughtData {
    item_id: AggregateId,
    occurred_at: DateTime<Utc>,
    payment_timeout: DateTime<Utc>,
    price: Money,
}

impl ItemBoughtData {
    pub fn new(
        item_id: AggregateId,
        occurred_at: DateTime<Utc>,
        payment_timeout: DateTime<Utc>,
        price: Money,
    ) -> Result<Self, ShopItemError> {
        if payment_timeout <= occurred_at {
            return Err(ShopItemError::InvalidArgument {
                reason: format!(
                    "payment timeout {payment_timeout} is not after purchase time {occurred_at}"
                ),
            });
        }
        if price.is_negative() {
            return Err(ShopItemError::InvalidArgument {
                reason: format!("price {price} is negative"),
            });
        }

        Ok(Self {
            item_id,
            occurred_at,
            payment_timeout,
            price,
        })
    }

    pub fn item_id(&self) -> AggregateId {
        self.item_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Deadline for the payment.
    pub fn payment_timeout(&self) -> DateTime<Utc> {
        self.payment_timeout
    }

    pub fn price(&self) -> Money {
        self.price
    }

    /// Returns true if the deadline lies before `now`.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.payment_timeout < now
    }
}

#[derive(Deserialize)]
struct RawItemBought {
    item_id: AggregateId,
    occurred_at: DateTime<Utc>,
    payment_timeout: DateTime<Utc>,
    price: Money,
}

impl TryFrom<RawItemBought> for ItemBoughtData {
    type Error = ShopItemError;

    fn try_from(raw: RawItemBought) -> Result<Self, Self::Error> {
        Self::new(raw.item_id, raw.occurred_at, raw.payment_timeout, raw.price)
    }
}

/// Data for the ItemPaid event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPaidData {
    pub item_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Data for the ItemPaymentTimeout event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPaymentTimeoutData {
    pub item_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}
