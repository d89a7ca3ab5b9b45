use common::{ItemId, OrderId, OrderStatus, UserId};
use document_store::{Filter, StoreError, StoreExt, VersionedStore};
use event_bus::EventBus;

use crate::events::publish;
use crate::{ItemReplica, Order, Outcome, ServiceError};

/// Service owning orders.
///
/// Reads items from its replica, which trails the item service.
pub struct OrderService<O, R, B> {
    orders: O,
    items: R,
    bus: B,
}

impl<O, R, B> OrderService<O, R, B>
where
    O: VersionedStore<Order>,
    R: VersionedStore<ItemReplica>,
    B: EventBus,
{
    /// Creates a new order service.
    pub fn new(orders: O, items: R, bus: B) -> Self {
        Self { orders, items, bus }
    }

    /// Returns true if an active order holds the item.
    pub async fn is_reserved(&self, item_id: ItemId) -> Result<bool, ServiceError> {
        let filter = Filter::new()
            .eq("item_id", item_id)
            .any_of("status", OrderStatus::ACTIVE);
        Ok(self.orders.any(&filter).await?)
    }

    /// Reserves an item for `user_id` by creating an order.
    ///
    /// The availability check is repeated atomically by the store: an active
    /// order claims its item, so of two racing reservations only one insert
    /// succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, item_id: ItemId, user_id: UserId) -> Result<Order, ServiceError> {
        let item = self
            .items
            .get(item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {item_id} not found")))?;

        if self.is_reserved(item_id).await? {
            metrics::counter!("reservation_conflicts_total").increment(1);
            return Err(ServiceError::Conflict("item is already reserved".to_string()));
        }

        let order = Order::new(user_id, item_id);
        match self.orders.insert(&order).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation { .. }) => {
                metrics::counter!("reservation_conflicts_total").increment(1);
                return Err(ServiceError::Conflict("item is already reserved".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        publish(&self.bus, &order.created_event(item.price)).await?;

        metrics::counter!("orders_reserved_total").increment(1);
        tracing::info!(order_id = %order.id, %item_id, "item reserved");
        Ok(order)
    }

    /// Loads an order owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn show(&self, order_id: OrderId, user_id: &UserId) -> Result<Order, ServiceError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;
        order.ensure_owner(user_id)?;
        Ok(order)
    }

    /// Lists the orders placed by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .orders
            .find(&Filter::new().eq("user_id", user_id))
            .await?)
    }

    /// Cancels an order on behalf of its owner.
    ///
    /// The order is deleted; the returned value and the published event
    /// describe the cancelled order at the version the cancellation produced.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId, user_id: &UserId) -> Result<Order, ServiceError> {
        let order = self.orders.require(order_id).await?;
        order.ensure_owner(user_id)?;
        if !order.status.can_cancel() {
            return Err(ServiceError::Conflict(format!(
                "cannot cancel a {} order",
                order.status
            )));
        }

        self.orders
            .delete_if_version(order.id, order.version)
            .await?;

        let cancelled = order.transitioned(OrderStatus::Cancelled);
        publish(&self.bus, &cancelled.cancelled_event()).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, item_id = %order.item_id, "order cancelled");
        Ok(cancelled)
    }

    /// Marks an order complete after its payment was recorded.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, order_id: OrderId) -> Result<Outcome<Order>, ServiceError> {
        let Some(order) = self.orders.get(order_id).await? else {
            return Ok(Outcome::Rejected(format!(
                "order {order_id} no longer exists"
            )));
        };

        match order.status {
            OrderStatus::Complete => {
                return Ok(Outcome::Duplicate(format!(
                    "order {order_id} is already complete"
                )));
            }
            status if !status.can_complete() => {
                return Ok(Outcome::Rejected(format!(
                    "cannot complete a {status} order"
                )));
            }
            _ => {}
        }

        let complete = order.transitioned(OrderStatus::Complete);
        self.orders.put_if_version(&complete, order.version).await?;

        metrics::counter!("orders_completed_total").increment(1);
        tracing::info!(%order_id, "order complete");
        Ok(Outcome::Applied(complete))
    }
}
