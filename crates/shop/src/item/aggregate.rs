//! Shop item aggregate implementation.

use chrono::{DateTime, TimeDelta, Utc};
use common::AggregateId;

use crate::aggregate::{Aggregate, DomainEvent};

use super::{Money, ShopItemError, ShopItemEvent, ShopItemState};

/// Shop item aggregate root.
///
/// Holds the item identity, the state derived from its events, and the
/// events recorded since the last commit. Every command consumes the item and
/// returns the next value; nothing is changed in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopItem {
    id: AggregateId,
    state: ShopItemState,
    changes: Vec<ShopItemEvent>,
}

impl Aggregate for ShopItem {
    type Event = ShopItemEvent;
    type Error = ShopItemError;

    fn aggregate_type() -> &'static str {
        "ShopItem"
    }

    fn new(id: AggregateId) -> Self {
        Self {
            id,
            state: ShopItemState::Initialized,
            changes: Vec::new(),
        }
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn from_history(
        id: AggregateId,
        history: impl IntoIterator<Item = ShopItemEvent>,
    ) -> Result<Self, ShopItemError> {
        // Each event carries the identity it was recorded under; replay takes
        // it on the same way the command path does.
        Ok(history
            .into_iter()
            .fold(Self::new(id), |item, event| item.apply(&event)))
    }

    fn uncommitted_events(&self) -> &[ShopItemEvent] {
        &self.changes
    }

    fn mark_committed(self) -> Self {
        Self {
            changes: Vec::new(),
            ..self
        }
    }
}

// Query methods
impl ShopItem {
    pub fn state(&self) -> ShopItemState {
        self.state
    }

    /// Returns true if the item has uncommitted events.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

// Command methods
impl ShopItem {
    /// Buys the item, setting a payment deadline `hours_to_timeout` hours
    /// after `now`.
    ///
    /// Buying an item that was already bought returns it unchanged.
    pub fn buy(
        self,
        id: AggregateId,
        now: DateTime<Utc>,
        hours_to_timeout: i64,
        price: Money,
    ) -> Result<Self, ShopItemError> {
        if !self.state.can_buy() {
            return Ok(self);
        }

        let payment_timeout = payment_deadline(now, hours_to_timeout)?;
        let event = ShopItemEvent::item_bought(id, now, payment_timeout, price)?;
        Ok(self.apply_change(event))
    }

    /// Records a payment. A payment after the deadline is still accepted.
    ///
    /// Paying an item that is already paid returns it unchanged.
    pub fn pay(self, now: DateTime<Utc>) -> Result<Self, ShopItemError> {
        self.reject_if(ShopItemState::Initialized, "cannot pay for an item never bought")?;

        if !self.state.can_pay() {
            return Ok(self);
        }

        let event = ShopItemEvent::item_paid(self.id, now);
        Ok(self.apply_change(event))
    }

    /// Records that the payment deadline passed.
    ///
    /// Timing out an item whose payment is already missing returns it
    /// unchanged.
    pub fn mark_timeout(self, now: DateTime<Utc>) -> Result<Self, ShopItemError> {
        self.reject_if(ShopItemState::Initialized, "payment not yet due")?;
        self.reject_if(ShopItemState::Paid, "already paid, cannot time out")?;

        if !self.state.can_mark_timeout() {
            return Ok(self);
        }

        let event = ShopItemEvent::item_payment_timeout(self.id, now);
        Ok(self.apply_change(event))
    }

    fn reject_if(&self, state: ShopItemState, reason: &'static str) -> Result<(), ShopItemError> {
        if self.state == state {
            return Err(ShopItemError::IllegalState {
                item_id: self.id,
                reason,
            });
        }
        Ok(())
    }
}

// Apply event helpers
impl ShopItem {
    /// Transition for one event. Replay relies on stored history having been
    /// produced by the guarded commands above, so the prior state is ignored.
    fn apply(self, event: &ShopItemEvent) -> Self {
        let state = match event {
            ShopItemEvent::ItemBought(_) => ShopItemState::Bought,
            ShopItemEvent::ItemPaid(_) => ShopItemState::Paid,
            ShopItemEvent::ItemPaymentTimeout(_) => ShopItemState::PaymentMissing,
        };
        Self {
            id: event.aggregate_id(),
            state,
            ..self
        }
    }

    fn apply_change(self, event: ShopItemEvent) -> Self {
        let mut item = self.apply(&event);
        item.changes.push(event);
        item
    }
}

fn payment_deadline(
    now: DateTime<Utc>,
    hours_to_timeout: i64,
) -> Result<DateTime<Utc>, ShopItemError> {
    let deadline = TimeDelta::try_hours(hours_to_timeout)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| ShopItemError::InvalidArgument {
            reason: format!("payment timeout of {hours_to_timeout} hours overflows"),
        })?;

    if deadline <= now {
        return Err(ShopItemError::InvalidArgument {
            reason: format!(
                "payment timeout of {hours_to_timeout} hours is not after purchase time {now}"
            ),
        });
    }

    Ok(deadline)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn price() -> Money {
        Money::from_cents(999)
    }

    fn bought() -> ShopItem {
        let id = AggregateId::new();
        ShopItem::new(id).buy(id, t0(), 24, price()).unwrap()
    }

    fn event_types(item: &ShopItem) -> Vec<&'static str> {
        item.uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }

    #[test]
    fn new_item_is_initialized_and_clean() {
        let id = AggregateId::new();
        let item = ShopItem::new(id);
        assert_eq!(item.id(), id);
        assert_eq!(item.state(), ShopItemState::Initialized);
        assert!(!item.has_changes());
    }

    #[test]
    fn buy_records_deadline_and_price() {
        let item = bought();

        assert_eq!(item.state(), ShopItemState::Bought);
        let [ShopItemEvent::ItemBought(data)] = item.uncommitted_events() else {
            panic!("expected a single ItemBought event");
        };
        assert_eq!(data.item_id(), item.id());
        assert_eq!(data.occurred_at(), t0());
        assert_eq!(data.payment_timeout(), t0() + Duration::hours(24));
        assert_eq!(data.price(), price());
    }

    #[test]
    fn buy_assigns_identity() {
        let provisional = AggregateId::new();
        let assigned = AggregateId::new();
        let item = ShopItem::new(provisional)
            .buy(assigned, t0(), 1, price())
            .unwrap();
        assert_eq!(item.id(), assigned);
    }

    #[test]
    fn buy_rejects_non_positive_hours() {
        for hours in [0, -1, -48] {
            let id = AggregateId::new();
            let result = ShopItem::new(id).buy(id, t0(), hours, price());
            assert!(
                matches!(result, Err(ShopItemError::InvalidArgument { .. })),
                "accepted {hours} hours"
            );
        }
    }

    #[test]
    fn buy_rejects_overflowing_hours() {
        let id = AggregateId::new();
        let result = ShopItem::new(id).buy(id, t0(), i64::MAX, price());
        assert!(matches!(result, Err(ShopItemError::InvalidArgument { .. })));
    }

    #[test]
    fn buy_rejects_negative_price() {
        let id = AggregateId::new();
        let result = ShopItem::new(id).buy(id, t0(), 24, Money::from_cents(-100));
        assert!(matches!(result, Err(ShopItemError::InvalidArgument { .. })));
    }

    #[test]
    fn buy_is_a_no_op_once_bought() {
        let item = bought();
        let id = item.id();
        let again = item.clone().buy(id, t0() + Duration::hours(1), 48, price()).unwrap();
        assert_eq!(again, item);
    }

    #[test]
    fn buy_is_a_no_op_after_payment_or_timeout() {
        let paid = bought().pay(t0()).unwrap().mark_committed();
        let missing = bought().mark_timeout(t0()).unwrap().mark_committed();

        for item in [paid, missing] {
            let id = item.id();
            let after = item.clone().buy(id, t0(), 24, price()).unwrap();
            assert_eq!(after, item);
            assert!(!after.has_changes());
        }
    }

    #[test]
    fn buy_is_a_no_op_even_with_invalid_arguments_once_bought() {
        let item = bought();
        let id = item.id();
        assert!(item.buy(id, t0(), 0, Money::from_cents(-1)).is_ok());
    }

    #[test]
    fn pay_before_buy_is_illegal() {
        let result = ShopItem::new(AggregateId::new()).pay(t0());
        assert!(matches!(
            result,
            Err(ShopItemError::IllegalState { reason, .. }) if reason.contains("never bought")
        ));
    }

    #[test]
    fn pay_transitions_to_paid() {
        let item = bought().pay(t0() + Duration::hours(1)).unwrap();
        assert_eq!(item.state(), ShopItemState::Paid);
        assert_eq!(event_types(&item), ["ItemBought", "ItemPaid"]);
    }

    #[test]
    fn pay_twice_is_a_no_op() {
        let paid = bought().pay(t0()).unwrap();
        let again = paid.clone().pay(t0() + Duration::hours(2)).unwrap();
        assert_eq!(again, paid);
    }

    #[test]
    fn late_payment_clears_missing_payment() {
        let item = bought()
            .mark_timeout(t0() + Duration::hours(25))
            .unwrap()
            .pay(t0() + Duration::hours(26))
            .unwrap();

        assert_eq!(item.state(), ShopItemState::Paid);
        assert_eq!(
            event_types(&item),
            ["ItemBought", "ItemPaymentTimeout", "ItemPaid"]
        );
    }

    #[test]
    fn timeout_before_buy_is_illegal() {
        let result = ShopItem::new(AggregateId::new()).mark_timeout(t0());
        assert!(matches!(
            result,
            Err(ShopItemError::IllegalState { reason, .. }) if reason.contains("not yet due")
        ));
    }

    #[test]
    fn timeout_after_payment_is_illegal() {
        let result = bought().pay(t0()).unwrap().mark_timeout(t0());
        assert!(matches!(
            result,
            Err(ShopItemError::IllegalState { reason, .. }) if reason.contains("already paid")
        ));
    }

    #[test]
    fn timeout_transitions_to_payment_missing() {
        let item = bought().mark_timeout(t0() + Duration::hours(25)).unwrap();
        assert_eq!(item.state(), ShopItemState::PaymentMissing);
        assert_eq!(event_types(&item), ["ItemBought", "ItemPaymentTimeout"]);
    }

    #[test]
    fn timeout_twice_is_a_no_op() {
        let missing = bought().mark_timeout(t0()).unwrap();
        let again = missing.clone().mark_timeout(t0() + Duration::hours(1)).unwrap();
        assert_eq!(again, missing);
    }

    #[test]
    fn mark_committed_clears_buffer_only() {
        let item = bought();
        let id = item.id();
        let committed = item.mark_committed();

        assert!(committed.uncommitted_events().is_empty());
        assert_eq!(committed.state(), ShopItemState::Bought);
        assert_eq!(committed.id(), id);
    }

    #[test]
    fn from_history_records_nothing() {
        let item = bought().pay(t0()).unwrap();
        let replayed =
            ShopItem::from_history(item.id(), item.uncommitted_events().to_vec()).unwrap();

        assert_eq!(replayed.state(), ShopItemState::Paid);
        assert!(!replayed.has_changes());
    }

    #[test]
    fn from_history_of_nothing_is_initialized() {
        let id = AggregateId::new();
        let item = ShopItem::from_history(id, Vec::new()).unwrap();
        assert_eq!(item, ShopItem::new(id));
    }

    #[test]
    fn from_history_takes_identity_assigned_by_buy() {
        let provisional = AggregateId::new();
        let assigned = AggregateId::new();
        let item = ShopItem::new(provisional)
            .buy(assigned, t0(), 24, price())
            .unwrap();

        let replayed =
            ShopItem::from_history(provisional, item.uncommitted_events().to_vec()).unwrap();
        assert_eq!(replayed.id(), assigned);
        assert_eq!(replayed.state(), item.state());
        assert_eq!(replayed, item.mark_committed());
    }

    #[test]
    fn replay_applies_transitions_unconditionally() {
        let id = AggregateId::new();
        let history = vec![
            ShopItemEvent::item_paid(id, t0()),
            ShopItemEvent::item_payment_timeout(id, t0()),
        ];
        let item = ShopItem::from_history(id, history).unwrap();
        assert_eq!(item.state(), ShopItemState::PaymentMissing);
    }

    #[test]
    fn from_history_is_deterministic() {
        let item = bought().mark_timeout(t0()).unwrap().pay(t0()).unwrap();
        let history = item.uncommitted_events().to_vec();

        let first = ShopItem::from_history(item.id(), history.clone()).unwrap();
        let second = ShopItem::from_history(item.id(), history).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.state(), item.state());
    }

    #[test]
    fn commands_continue_from_replayed_state() {
        let committed = bought().mark_committed();
        let history = vec![ShopItemEvent::item_bought(
            committed.id(),
            t0(),
            t0() + Duration::hours(24),
            price(),
        )
        .unwrap()];

        let item = ShopItem::from_history(committed.id(), history)
            .unwrap()
            .pay(t0())
            .unwrap();
        assert_eq!(event_types(&item), ["ItemPaid"]);
    }
}
