//! Event contracts exchanged between services.
//!
//! Each event is published on its own subject. Payloads are JSON with
//! snake_case field names; `version` is always the version of the owning
//! aggregate *after* the change the event describes.

use serde::{Deserialize, Serialize};

use crate::{ChargeId, ItemId, OrderId, OrderStatus, PaymentId, UserId};

/// Subject names used on the event bus.
pub mod subjects {
    pub const ITEM_CREATED: &str = "item:created";
    pub const ITEM_UPDATED: &str = "item:updated";
    pub const ORDER_CREATED: &str = "order:created";
    pub const ORDER_CANCELLED: &str = "order:cancelled";
    pub const PAYMENT_CREATED: &str = "payment:created";
}

/// An event with a fixed subject.
pub trait Event: Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// The subject this event is published on.
    const SUBJECT: &'static str;
}

/// Published by the item service whenever a canonical item is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub id: ItemId,
    pub title: String,
    pub price: i64,
    pub version: i64,
    pub user_id: UserId,
}

impl Event for ItemCreated {
    const SUBJECT: &'static str = subjects::ITEM_CREATED;
}

/// Published by the item service after every successful canonical update,
/// including reservation changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub id: ItemId,
    pub title: String,
    pub price: i64,
    pub version: i64,
    pub user_id: UserId,
}

impl Event for ItemUpdated {
    const SUBJECT: &'static str = subjects::ITEM_UPDATED;
}

/// Published by the order service when an item is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub id: OrderId,
    pub version: i64,
    pub status: OrderStatus,
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Item price at the moment of reservation.
    pub charge: i64,
}

impl Event for OrderCreated {
    const SUBJECT: &'static str = subjects::ORDER_CREATED;
}

/// Published by the order service when the owner cancels an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub id: OrderId,
    pub version: i64,
    pub item_id: ItemId,
}

impl Event for OrderCancelled {
    const SUBJECT: &'static str = subjects::ORDER_CANCELLED;
}

/// Published by the payment service after a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCreated {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub charge_id: ChargeId,
}

impl Event for PaymentCreated {
    const SUBJECT: &'static str = subjects::PAYMENT_CREATED;
}
