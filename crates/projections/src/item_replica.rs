//! Item replica kept by the order service.

use async_trait::async_trait;
use common::messages::{ItemCreated, ItemUpdated, subjects};
use document_store::VersionedStore;
use domain::ItemReplica;
use event_bus::{HandlerError, Message, MessageHandler};

use crate::classify_write_error;

/// Applies `item:created` and `item:updated` to the item replica.
pub struct ItemReplicaSync<S> {
    replicas: S,
}

impl<S: VersionedStore<ItemReplica>> ItemReplicaSync<S> {
    pub fn new(replicas: S) -> Self {
        Self { replicas }
    }

    #[tracing::instrument(skip(self, event), fields(item_id = %event.id, version = event.version))]
    pub async fn apply_created(&self, event: &ItemCreated) -> Result<(), HandlerError> {
        let replica = ItemReplica::from(event);
        self.replicas
            .insert(&replica)
            .await
            .map_err(|e| classify_write_error(e, replica.version))?;

        tracing::debug!("item replica created");
        Ok(())
    }

    #[tracing::instrument(skip(self, event), fields(item_id = %event.id, version = event.version))]
    pub async fn apply_updated(&self, event: &ItemUpdated) -> Result<(), HandlerError> {
        let replica = ItemReplica::from(event);
        let Some(expected) = replica.version.previous() else {
            return Err(HandlerError::Rejected(format!(
                "item {} updated to version {}",
                event.id, event.version
            )));
        };

        self.replicas
            .put_if_version(&replica, expected)
            .await
            .map_err(|e| classify_write_error(e, replica.version))?;

        tracing::debug!("item replica updated");
        Ok(())
    }
}

#[async_trait]
impl<S: VersionedStore<ItemReplica>> MessageHandler for ItemReplicaSync<S> {
    fn name(&self) -> &'static str {
        "item_replica_sync"
    }

    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        match message.subject.as_str() {
            subjects::ITEM_CREATED => self.apply_created(&message.decode()?).await,
            subjects::ITEM_UPDATED => self.apply_updated(&message.decode()?).await,
            other => Err(HandlerError::Rejected(format!("unexpected subject {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{ItemId, UserId};
    use document_store::{InMemoryStore, StoreExt, Version};

    use super::*;

    fn created(id: ItemId) -> ItemCreated {
        ItemCreated {
            id,
            title: "Concert".into(),
            price: 100,
            version: 0,
            user_id: UserId::new("seller"),
        }
    }

    fn updated(id: ItemId, version: i64, price: i64) -> ItemUpdated {
        ItemUpdated {
            id,
            title: "Concert".into(),
            price,
            version,
            user_id: UserId::new("seller"),
        }
    }

    #[tokio::test]
    async fn applies_creation_once() {
        let store = InMemoryStore::new();
        let sync = ItemReplicaSync::new(store.clone());
        let id = ItemId::new();

        sync.apply_created(&created(id)).await.unwrap();
        let again = sync.apply_created(&created(id)).await;
        assert!(matches!(again, Err(HandlerError::Duplicate(_))));
        assert_eq!(store.require(id).await.unwrap().version, Version::initial());
    }

    #[tokio::test]
    async fn duplicate_update_is_a_no_op() {
        let store = InMemoryStore::new();
        let sync = ItemReplicaSync::new(store.clone());
        let id = ItemId::new();
        sync.apply_created(&created(id)).await.unwrap();

        sync.apply_updated(&updated(id, 1, 150)).await.unwrap();
        let again = sync.apply_updated(&updated(id, 1, 150)).await;
        assert!(matches!(again, Err(HandlerError::Duplicate(_))));

        let replica = store.require(id).await.unwrap();
        assert_eq!(replica.version, Version::new(1));
        assert_eq!(replica.price, 150);
    }

    #[tokio::test]
    async fn update_ahead_of_predecessor_waits() {
        let store = InMemoryStore::new();
        let sync = ItemReplicaSync::new(store.clone());
        let id = ItemId::new();
        sync.apply_created(&created(id)).await.unwrap();

        let early = sync.apply_updated(&updated(id, 2, 200)).await;
        assert!(matches!(early, Err(HandlerError::OutOfOrder(_))));

        sync.apply_updated(&updated(id, 1, 150)).await.unwrap();
        sync.apply_updated(&updated(id, 2, 200)).await.unwrap();
        assert_eq!(store.require(id).await.unwrap().price, 200);
    }

    #[tokio::test]
    async fn update_before_creation_waits() {
        let sync = ItemReplicaSync::new(InMemoryStore::new());
        let result = sync.apply_updated(&updated(ItemId::new(), 1, 150)).await;
        assert!(matches!(result, Err(HandlerError::OutOfOrder(_))));
    }

    #[tokio::test]
    async fn malformed_payload_is_not_redelivered() {
        let sync = ItemReplicaSync::new(InMemoryStore::new());
        let message = Message::new(subjects::ITEM_UPDATED, b"{\"id\": 3}".to_vec());
        let result = sync.handle(&message).await;
        assert!(matches!(result, Err(HandlerError::Malformed(_))));
    }
}
