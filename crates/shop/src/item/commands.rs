//! Shop item commands.

use chrono::{DateTime, Utc};
use common::AggregateId;

use crate::command::Command;

use super::{Money, ShopItem};

/// Command to buy an item.
#[derive(Debug, Clone)]
pub struct BuyItem {
    pub item_id: AggregateId,

    pub price: Money,

    /// When the purchase happened.
    pub at: DateTime<Utc>,

    /// Overrides the configured payment window.
    pub hours_to_timeout: Option<i64>,
}

impl BuyItem {
    pub fn new(item_id: AggregateId, price: Money, at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            price,
            at,
            hours_to_timeout: None,
        }
    }

    /// Creates a BuyItem command for a freshly generated item id.
    pub fn for_new_item(price: Money, at: DateTime<Utc>) -> Self {
        Self::new(AggregateId::new(), price, at)
    }

    pub fn with_hours_to_timeout(mut self, hours: i64) -> Self {
        self.hours_to_timeout = Some(hours);
        self
    }
}

impl Command for BuyItem {
    type Aggregate = ShopItem;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}

/// Command to record a payment.
#[derive(Debug, Clone)]
pub struct PayItem {
    pub item_id: AggregateId,
    pub at: DateTime<Utc>,
}

impl PayItem {
    pub fn new(item_id: AggregateId, at: DateTime<Utc>) -> Self {
        Self { item_id, at }
    }
}

impl Command for PayItem {
    type Aggregate = ShopItem;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}

/// Command to record that the payment deadline passed.
#[derive(Debug, Clone)]
pub struct MarkPaymentTimeout {
    pub item_id: AggregateId,
    pub at: DateTime<Utc>,
}

impl MarkPaymentTimeout {
    pub fn new(item_id: AggregateId, at: DateTime<Utc>) -> Self {
        Self { item_id, at }
    }
}

impl Command for MarkPaymentTimeout {
    type Aggregate = ShopItem;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}
