//! Shop item service providing a simplified API for item operations.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{EventEnvelope, EventStore};

use crate::aggregate::DomainEvent;
use crate::command::{CommandHandler, CommandResult};
use crate::config::ShopConfig;
use crate::error::ShopError;

use super::{BuyItem, MarkPaymentTimeout, PayItem, ShopItem, ShopItemError, ShopItemEvent};

/// Outcome of an overdue payment sweep.
#[derive(Debug, Default)]
pub struct OverdueSweep {
    /// Items that were marked as missing their payment.
    pub timed_out: Vec<AggregateId>,

    /// Items the sweep could not process, with the error for each.
    pub failed: Vec<(AggregateId, ShopError)>,
}

/// Service for managing shop items.
///
/// Wraps the command handler with one method per command and carries the
/// configured payment window.
pub struct ShopItemService<S: EventStore> {
    handler: CommandHandler<S, ShopItem>,
    config: ShopConfig,
}

impl<S: EventStore> ShopItemService<S> {
    pub fn new(store: S, config: ShopConfig) -> Self {
        Self {
            handler: CommandHandler::new(store),
            config,
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, ShopItem> {
        &self.handler
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// Buys an item. Repeated purchases of the same item are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn buy(&self, cmd: BuyItem) -> Result<CommandResult<ShopItem>, ShopError> {
        let item_id = cmd.item_id;
        let hours = cmd
            .hours_to_timeout
            .unwrap_or(self.config.payment_timeout_hours);

        self.handler
            .handle(&cmd, |item| item.buy(item_id, cmd.at, hours, cmd.price))
            .await
    }

    /// Pays for an item. Repeated payments are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, cmd: PayItem) -> Result<CommandResult<ShopItem>, ShopError> {
        self.handler.handle(&cmd, |item| item.pay(cmd.at)).await
    }

    /// Marks the payment of an item as missing. Repeated timeouts are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn mark_timeout(
        &self,
        cmd: MarkPaymentTimeout,
    ) -> Result<CommandResult<ShopItem>, ShopError> {
        self.handler
            .handle(&cmd, |item| item.mark_timeout(cmd.at))
            .await
    }

    /// Returns an item by id, or None if it was never bought.
    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, item_id: AggregateId) -> Result<Option<ShopItem>, ShopError> {
        self.handler.load_existing(item_id).await
    }

    /// Marks every bought item whose payment deadline lies before `now` as
    /// missing its payment.
    ///
    /// Items that were paid in the meantime, or already timed out, are left
    /// alone. A stream that cannot be processed is logged and reported in
    /// [`OverdueSweep::failed`]; the sweep carries on with the next one.
    #[tracing::instrument(skip(self))]
    pub async fn time_out_overdue_items(
        &self,
        now: DateTime<Utc>,
    ) -> Result<OverdueSweep, ShopError> {
        let purchases = self.handler.store().get_events_by_type("ItemBought").await?;

        let mut sweep = OverdueSweep::default();
        for envelope in &purchases {
            let item_id = envelope.aggregate_id;
            match self.time_out_if_overdue(envelope, now).await {
                Ok(true) => sweep.timed_out.push(item_id),
                Ok(false) => {}
                Err(error) => {
                    metrics::counter!("shop_payment_timeout_failures_total").increment(1);
                    tracing::warn!(%item_id, %error, "could not time out overdue item");
                    sweep.failed.push((item_id, error));
                }
            }
        }

        metrics::counter!("shop_payment_timeouts_total").increment(sweep.timed_out.len() as u64);
        tracing::info!(
            checked = purchases.len(),
            timed_out = sweep.timed_out.len(),
            failed = sweep.failed.len(),
            "overdue payment sweep finished"
        );
        Ok(sweep)
    }

    /// Returns true if the purchase was overdue and the item got timed out.
    async fn time_out_if_overdue(
        &self,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<bool, ShopError> {
        let event = ShopItemEvent::from_envelope(envelope).map_err(ShopItemError::from)?;
        let ShopItemEvent::ItemBought(bought) = event else {
            return Ok(false);
        };
        if !bought.is_overdue_at(now) {
            return Ok(false);
        }

        let result = self
            .handler
            .execute(envelope.aggregate_id, |item| {
                if item.state().can_mark_timeout() {
                    item.mark_timeout(now)
                } else {
                    Ok(item)
                }
            })
            .await?;
        Ok(!result.is_no_op())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use event_store::{AppendOptions, InMemoryEventStore, Version};

    use super::*;
    use crate::item::{Money, ShopItemState};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn service() -> ShopItemService<InMemoryEventStore> {
        ShopItemService::new(InMemoryEventStore::new(), ShopConfig::default())
    }

    #[tokio::test]
    async fn buy_uses_configured_window() {
        let config = ShopConfig {
            payment_timeout_hours: 48,
            ..ShopConfig::default()
        };
        let service = ShopItemService::new(InMemoryEventStore::new(), config);

        let result = service
            .buy(BuyItem::for_new_item(Money::from_cents(999), t0()))
            .await
            .unwrap();

        let [ShopItemEvent::ItemBought(data)] = result.events.as_slice() else {
            panic!("expected ItemBought");
        };
        assert_eq!(data.payment_timeout(), t0() + Duration::hours(48));
    }

    #[tokio::test]
    async fn buy_override_beats_config() {
        let service = service();
        let result = service
            .buy(BuyItem::for_new_item(Money::from_cents(999), t0()).with_hours_to_timeout(2))
            .await
            .unwrap();

        let [ShopItemEvent::ItemBought(data)] = result.events.as_slice() else {
            panic!("expected ItemBought");
        };
        assert_eq!(data.payment_timeout(), t0() + Duration::hours(2));
    }

    #[tokio::test]
    async fn get_item_is_none_until_bought() {
        let service = service();
        let id = AggregateId::new();
        assert!(service.get_item(id).await.unwrap().is_none());

        service
            .buy(BuyItem::new(id, Money::from_cents(100), t0()))
            .await
            .unwrap();
        let item = service.get_item(id).await.unwrap().unwrap();
        assert_eq!(item.state(), ShopItemState::Bought);
    }

    #[tokio::test]
    async fn sweep_times_out_only_overdue_unpaid_items() {
        let service = service();
        let overdue = AggregateId::new();
        let paid = AggregateId::new();
        let fresh = AggregateId::new();

        for id in [overdue, paid] {
            service
                .buy(BuyItem::new(id, Money::from_cents(100), t0()))
                .await
                .unwrap();
        }
        service
            .buy(BuyItem::new(fresh, Money::from_cents(100), t0() + Duration::hours(20)))
            .await
            .unwrap();
        service
            .pay(PayItem::new(paid, t0() + Duration::hours(1)))
            .await
            .unwrap();

        let now = t0() + Duration::hours(25);
        let sweep = service.time_out_overdue_items(now).await.unwrap();
        assert_eq!(sweep.timed_out, [overdue]);
        assert!(sweep.failed.is_empty());

        let states = [
            service.get_item(overdue).await.unwrap().unwrap().state(),
            service.get_item(paid).await.unwrap().unwrap().state(),
            service.get_item(fresh).await.unwrap().unwrap().state(),
        ];
        assert_eq!(
            states,
            [
                ShopItemState::PaymentMissing,
                ShopItemState::Paid,
                ShopItemState::Bought
            ]
        );

        // A second sweep finds nothing new.
        let again = service.time_out_overdue_items(now).await.unwrap();
        assert!(again.timed_out.is_empty());
    }

    #[tokio::test]
    async fn sweep_skips_unreadable_purchase_and_carries_on() {
        let store = InMemoryEventStore::new();
        let service = ShopItemService::new(store.clone(), ShopConfig::default());
        let broken = AggregateId::new();
        let overdue = AggregateId::new();

        let envelope = EventEnvelope::builder()
            .aggregate_id(broken)
            .aggregate_type("ShopItem")
            .event_type("ItemBought")
            .version(Version::first())
            .occurred_at(t0() - Duration::hours(1))
            .payload_raw(serde_json::json!({"type": "ItemBought", "data": {}}))
            .build()
            .unwrap();
        store
            .append(vec![envelope], AppendOptions::expect_new())
            .await
            .unwrap();
        service
            .buy(BuyItem::new(overdue, Money::from_cents(100), t0()))
            .await
            .unwrap();

        let sweep = service
            .time_out_overdue_items(t0() + Duration::hours(48))
            .await
            .unwrap();

        assert_eq!(sweep.timed_out, [overdue]);
        assert!(matches!(
            sweep.failed.as_slice(),
            [(id, ShopError::ShopItem(ShopItemError::InvalidArgument { .. }))] if *id == broken
        ));
        let item = service.get_item(overdue).await.unwrap().unwrap();
        assert_eq!(item.state(), ShopItemState::PaymentMissing);
    }
}
