//! Demo runner: drives two shop items through their lifecycle against an
//! in-memory event store.

use chrono::{Duration, Utc};
use event_store::InMemoryEventStore;
use shop::{Aggregate, BuyItem, MarkPaymentTimeout, Money, PayItem, ShopConfig, ShopItemService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ShopConfig::from_env()?;
    shop::telemetry::init(&config)?;
    tracing::info!(?config, "starting shop demo");

    let service = ShopItemService::new(InMemoryEventStore::new(), config);
    let price: Money = "9.99".parse()?;
    let t0 = Utc::now();

    // Paid within the window.
    let paid = service.buy(BuyItem::for_new_item(price, t0)).await?;
    let paid_id = paid.aggregate.id();
    let result = service
        .pay(PayItem::new(paid_id, t0 + Duration::hours(1)))
        .await?;
    tracing::info!(item = %paid_id, state = %result.aggregate.state(), "paid in time");

    // Missed the deadline, then paid late.
    let late = service.buy(BuyItem::for_new_item(price, t0)).await?;
    let late_id = late.aggregate.id();
    let overdue_at = t0 + Duration::hours(service.config().payment_timeout_hours + 1);
    let sweep = service.time_out_overdue_items(overdue_at).await?;
    tracing::info!(timed_out = ?sweep.timed_out, failed = sweep.failed.len(), "overdue sweep");

    // Redundant timeout signal, absorbed.
    let result = service
        .mark_timeout(MarkPaymentTimeout::new(late_id, overdue_at))
        .await?;
    tracing::info!(item = %late_id, no_op = result.is_no_op(), "repeated timeout");

    let result = service
        .pay(PayItem::new(late_id, overdue_at + Duration::hours(1)))
        .await?;
    tracing::info!(
        item = %late_id,
        state = %result.aggregate.state(),
        version = %result.new_version,
        "paid late"
    );

    Ok(())
}
