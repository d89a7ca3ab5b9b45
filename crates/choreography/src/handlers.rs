//! Cross-service reactions.

use std::sync::Arc;

use async_trait::async_trait;
use common::messages::{OrderCancelled, OrderCreated, PaymentCreated, subjects};
use document_store::VersionedStore;
use domain::{
    Item, ItemReplica, ItemService, Order, OrderService, Outcome, ServiceError,
};
use event_bus::{EventBus, HandlerError, Message, MessageHandler};

/// Maps a service outcome onto the acknowledgement policy.
///
/// A `Conflict` here can only come from a lost conditional update, so it is
/// retried against fresh state.
fn settle<T>(result: Result<Outcome<T>, ServiceError>) -> Result<(), HandlerError> {
    match result {
        Ok(Outcome::Applied(_)) => Ok(()),
        Ok(Outcome::Duplicate(reason)) => Err(HandlerError::Duplicate(reason)),
        Ok(Outcome::Rejected(reason)) => Err(HandlerError::Rejected(reason)),
        Ok(Outcome::Deferred(reason)) => Err(HandlerError::OutOfOrder(reason)),
        Err(ServiceError::Conflict(reason)) => Err(HandlerError::Transient(reason)),
        Err(ServiceError::NotFound(reason)) => Err(HandlerError::Rejected(reason)),
        Err(e) => Err(HandlerError::Transient(e.to_string())),
    }
}

/// Item service reaction to order lifecycle events: keeps the canonical
/// item's reservation pointer in step with the order.
pub struct ReservationUpdater<S, B> {
    items: Arc<ItemService<S, B>>,
}

impl<S, B> ReservationUpdater<S, B> {
    pub fn new(items: Arc<ItemService<S, B>>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<S, B> MessageHandler for ReservationUpdater<S, B>
where
    S: VersionedStore<Item> + 'static,
    B: EventBus + 'static,
{
    fn name(&self) -> &'static str {
        "reservation_updater"
    }

    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        match message.subject.as_str() {
            subjects::ORDER_CREATED => {
                let event: OrderCreated = message.decode()?;
                settle(self.items.reserve_for_order(event.item_id, event.id).await)
            }
            subjects::ORDER_CANCELLED => {
                let event: OrderCancelled = message.decode()?;
                settle(self.items.release_from_order(event.item_id, event.id).await)
            }
            other => Err(HandlerError::Rejected(format!("unexpected subject {other}"))),
        }
    }
}

/// Order service reaction to `payment:created`: completes the order.
pub struct PaymentCompletion<O, R, B> {
    orders: Arc<OrderService<O, R, B>>,
}

impl<O, R, B> PaymentCompletion<O, R, B> {
    pub fn new(orders: Arc<OrderService<O, R, B>>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl<O, R, B> MessageHandler for PaymentCompletion<O, R, B>
where
    O: VersionedStore<Order> + 'static,
    R: VersionedStore<ItemReplica> + 'static,
    B: EventBus + 'static,
{
    fn name(&self) -> &'static str {
        "payment_completion"
    }

    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let event: PaymentCreated = message.decode()?;
        settle(self.orders.complete(event.order_id).await)
    }
}
