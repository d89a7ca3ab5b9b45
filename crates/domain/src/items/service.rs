use common::{ItemId, OrderId, UserId};
use document_store::{Filter, StoreExt, VersionedStore};
use event_bus::EventBus;

use crate::events::publish;
use crate::{Item, Outcome, ServiceError};

/// Service owning canonical items.
///
/// Every accepted change bumps the item version by one and publishes
/// `item:updated` carrying the new version.
pub struct ItemService<S, B> {
    items: S,
    bus: B,
}

impl<S, B> ItemService<S, B>
where
    S: VersionedStore<Item>,
    B: EventBus,
{
    /// Creates a new item service.
    pub fn new(items: S, bus: B) -> Self {
        Self { items, bus }
    }

    /// Lists an item for sale.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: UserId,
        title: String,
        price: i64,
    ) -> Result<Item, ServiceError> {
        let item = Item::new(user_id, title, price);
        self.items.insert(&item).await?;
        publish(&self.bus, &item.created_event()).await?;

        metrics::counter!("items_created_total").increment(1);
        tracing::info!(item_id = %item.id, "item created");
        Ok(item)
    }

    /// Changes title and price. Only the owner may do this, and only while
    /// the item is not reserved.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        item_id: ItemId,
        user_id: &UserId,
        title: String,
        price: i64,
    ) -> Result<Item, ServiceError> {
        let item = self.items.require(item_id).await?;
        if item.user_id != *user_id {
            return Err(ServiceError::Unauthorized(format!(
                "item {item_id} belongs to another user"
            )));
        }
        if item.is_reserved() {
            return Err(ServiceError::Conflict(
                "cannot edit a reserved item".to_string(),
            ));
        }

        let updated = Item {
            title,
            price,
            version: item.version.next(),
            ..item.clone()
        };
        self.items.put_if_version(&updated, item.version).await?;
        publish(&self.bus, &updated.updated_event()).await?;

        tracing::info!(item_id = %item_id, version = %updated.version, "item updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn show(&self, item_id: ItemId) -> Result<Item, ServiceError> {
        self.items
            .get(item_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("item {item_id} not found")))
    }

    /// Lists items nobody has reserved.
    #[tracing::instrument(skip(self))]
    pub async fn available(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.items.find(&Filter::new().is_null("reserved_by")).await?)
    }

    /// Points the item at `order_id`.
    ///
    /// An item still held by another order is deferred: that order's
    /// cancellation has not reached the item yet. A version conflict
    /// surfaces as `ServiceError::Conflict`; callers retry with a fresh load.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_for_order(
        &self,
        item_id: ItemId,
        order_id: OrderId,
    ) -> Result<Outcome<Item>, ServiceError> {
        let Some(item) = self.items.get(item_id).await? else {
            return Ok(Outcome::Rejected(format!("item {item_id} does not exist")));
        };

        if item.saw_cancellation_of(order_id) {
            return Ok(Outcome::Duplicate(format!(
                "order {order_id} was cancelled before it reserved item {item_id}"
            )));
        }

        match item.reserved_by {
            Some(holder) if holder == order_id => {
                return Ok(Outcome::Duplicate(format!(
                    "item {item_id} already reserved by order {order_id}"
                )));
            }
            Some(holder) => {
                return Ok(Outcome::Deferred(format!(
                    "item {item_id} is still held by order {holder}"
                )));
            }
            None => {}
        }

        let expected = item.version;
        let reserved = Item {
            reserved_by: Some(order_id),
            version: expected.next(),
            ..item
        };
        self.items.put_if_version(&reserved, expected).await?;
        publish(&self.bus, &reserved.updated_event()).await?;

        tracing::info!(%item_id, %order_id, version = %reserved.version, "item reserved");
        Ok(Outcome::Applied(reserved))
    }

    /// Records the cancellation of `order_id` and clears the reservation
    /// pointer if it points at that order.
    ///
    /// The cancellation is recorded even when the order never reserved the
    /// item, so its `order:created` arriving later cannot reserve it.
    #[tracing::instrument(skip(self))]
    pub async fn release_from_order(
        &self,
        item_id: ItemId,
        order_id: OrderId,
    ) -> Result<Outcome<Item>, ServiceError> {
        let Some(item) = self.items.get(item_id).await? else {
            return Ok(Outcome::Rejected(format!("item {item_id} does not exist")));
        };

        if item.saw_cancellation_of(order_id) {
            return Ok(Outcome::Duplicate(format!(
                "order {order_id} already released item {item_id}"
            )));
        }

        let expected = item.version;
        let mut released = Item {
            version: expected.next(),
            ..item
        };
        let was_holder = released.reserved_by == Some(order_id);
        if was_holder {
            released.reserved_by = None;
        }
        released.cancelled_orders.push(order_id);

        self.items.put_if_version(&released, expected).await?;
        publish(&self.bus, &released.updated_event()).await?;

        if was_holder {
            tracing::info!(%item_id, %order_id, version = %released.version, "item released");
        } else {
            tracing::info!(%item_id, %order_id, version = %released.version, "cancellation recorded ahead of reservation");
        }
        Ok(Outcome::Applied(released))
    }
}

#[cfg(test)]
mod tests {
    use common::messages::{ItemUpdated, subjects};
    use document_store::{InMemoryStore, Version};
    use event_bus::InMemoryEventBus;

    use super::*;

    fn service() -> (ItemService<InMemoryStore<Item>, InMemoryEventBus>, InMemoryEventBus) {
        let bus = InMemoryEventBus::recording();
        (ItemService::new(InMemoryStore::new(), bus.clone()), bus)
    }

    fn seller() -> UserId {
        UserId::new("seller")
    }

    #[tokio::test]
    async fn create_then_show() {
        let (service, bus) = service();
        let item = service
            .create(seller(), "Concert".into(), 100)
            .await
            .unwrap();

        let shown = service.show(item.id).await.unwrap();
        assert_eq!(shown.title, "Concert");
        assert_eq!(shown.price, 100);
        assert_eq!(shown.version, Version::initial());
        assert_eq!(shown.reserved_by, None);
        assert_eq!(bus.published(subjects::ITEM_CREATED).await.len(), 1);
    }

    #[tokio::test]
    async fn show_missing_is_not_found() {
        let (service, _) = service();
        let result = service.show(ItemId::new()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_bumps_version_and_publishes() {
        let (service, bus) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();

        let updated = service
            .update(item.id, &seller(), "Opera".into(), 120)
            .await
            .unwrap();
        assert_eq!(updated.version, Version::new(1));

        let events: Vec<ItemUpdated> = bus.published_events(subjects::ITEM_UPDATED).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[0].title, "Opera");
    }

    #[tokio::test]
    async fn update_by_stranger_is_unauthorized() {
        let (service, _) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();

        let result = service
            .update(item.id, &UserId::new("stranger"), "Mine".into(), 1)
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn reserved_item_cannot_be_edited() {
        let (service, _) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        service
            .reserve_for_order(item.id, OrderId::new())
            .await
            .unwrap();

        let result = service
            .update(item.id, &seller(), "Opera".into(), 120)
            .await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn reserve_is_idempotent_per_order() {
        let (service, bus) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        let order = OrderId::new();

        let first = service.reserve_for_order(item.id, order).await.unwrap();
        let reserved = first.applied().unwrap();
        assert_eq!(reserved.reserved_by, Some(order));
        assert_eq!(reserved.version, Version::new(1));

        let again = service.reserve_for_order(item.id, order).await.unwrap();
        assert!(matches!(again, Outcome::Duplicate(_)));
        assert_eq!(bus.published(subjects::ITEM_UPDATED).await.len(), 1);
    }

    #[tokio::test]
    async fn reserve_held_by_other_order_is_deferred() {
        let (service, _) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        service
            .reserve_for_order(item.id, OrderId::new())
            .await
            .unwrap();

        let other = service
            .reserve_for_order(item.id, OrderId::new())
            .await
            .unwrap();
        assert!(matches!(other, Outcome::Deferred(_)));
    }

    #[tokio::test]
    async fn release_clears_matching_order_once() {
        let (service, bus) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        let order = OrderId::new();
        service.reserve_for_order(item.id, order).await.unwrap();

        let released = service
            .release_from_order(item.id, order)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(released.reserved_by, None);
        assert_eq!(released.version, Version::new(2));

        let again = service.release_from_order(item.id, order).await.unwrap();
        assert!(matches!(again, Outcome::Duplicate(_)));
        assert_eq!(bus.published(subjects::ITEM_UPDATED).await.len(), 2);
    }

    #[tokio::test]
    async fn release_of_other_order_keeps_holder() {
        let (service, _) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        let holder = OrderId::new();
        service.reserve_for_order(item.id, holder).await.unwrap();

        let other = OrderId::new();
        let recorded = service
            .release_from_order(item.id, other)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(recorded.reserved_by, Some(holder));
        assert!(recorded.saw_cancellation_of(other));
    }

    #[tokio::test]
    async fn cancellation_ahead_of_creation_blocks_reservation() {
        let (service, _) = service();
        let item = service.create(seller(), "Concert".into(), 100).await.unwrap();
        let order = OrderId::new();

        let recorded = service
            .release_from_order(item.id, order)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(recorded.version, Version::new(1));

        let late = service.reserve_for_order(item.id, order).await.unwrap();
        assert!(matches!(late, Outcome::Duplicate(_)));
        assert_eq!(service.show(item.id).await.unwrap().reserved_by, None);
    }

    #[tokio::test]
    async fn available_excludes_reserved_items() {
        let (service, _) = service();
        let free = service.create(seller(), "Free".into(), 10).await.unwrap();
        let held = service.create(seller(), "Held".into(), 20).await.unwrap();
        service
            .reserve_for_order(held.id, OrderId::new())
            .await
            .unwrap();

        let available = service.available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, free.id);
    }
}
