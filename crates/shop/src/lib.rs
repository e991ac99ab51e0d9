//! Event-sourced shop item domain.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced values
//! - Command trait and CommandHandler bridging aggregates and the event store
//! - The ShopItem aggregate with its buy / pay / payment-timeout state machine
//! - ShopItemService, configuration and tracing setup

pub mod aggregate;
pub mod command;
pub mod config;
pub mod error;
pub mod item;
pub mod telemetry;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use config::{ConfigError, LogFormat, ShopConfig};
pub use error::{EventDecodeError, ShopError};
pub use item::{
    BuyItem, ItemBoughtData, ItemPaidData, ItemPaymentTimeoutData, MarkPaymentTimeout, Money,
    OverdueSweep, ParseMoneyError, PayItem, ShopItem, ShopItemError, ShopItemEvent,
    ShopItemService, ShopItemState,
};
