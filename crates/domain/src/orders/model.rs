use common::messages::{ItemCreated, ItemUpdated, OrderCancelled, OrderCreated};
use common::{ItemId, OrderId, OrderStatus, UserId};
use document_store::{Document, Version};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// An order holding one item for one buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub status: OrderStatus,
    pub version: Version,
}

impl Order {
    /// Creates an order in the `created` status at the initial version.
    pub fn new(user_id: UserId, item_id: ItemId) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            item_id,
            status: OrderStatus::Created,
            version: Version::initial(),
        }
    }

    /// Fails with `Unauthorized` unless `user_id` placed this order.
    pub fn ensure_owner(&self, user_id: &UserId) -> Result<(), ServiceError> {
        if self.user_id != *user_id {
            return Err(ServiceError::Unauthorized(format!(
                "order {} belongs to another user",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns the order moved to `status` at the next version.
    pub fn transitioned(&self, status: OrderStatus) -> Self {
        Self {
            status,
            version: self.version.next(),
            ..self.clone()
        }
    }

    pub fn created_event(&self, charge: i64) -> OrderCreated {
        OrderCreated {
            id: self.id,
            version: self.version.as_i64(),
            status: self.status,
            user_id: self.user_id.clone(),
            item_id: self.item_id,
            charge,
        }
    }

    pub fn cancelled_event(&self) -> OrderCancelled {
        OrderCancelled {
            id: self.id,
            version: self.version.as_i64(),
            item_id: self.item_id,
        }
    }
}

impl Document for Order {
    type Id = OrderId;
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> OrderId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    /// An active order claims its item, so two active orders can never
    /// hold the same item.
    fn unique_key(&self) -> Option<String> {
        self.status
            .is_active()
            .then(|| format!("item:{}", self.item_id))
    }
}

/// The order service's read-only copy of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReplica {
    pub id: ItemId,
    pub title: String,
    pub price: i64,
    pub version: Version,
}

impl From<&ItemCreated> for ItemReplica {
    fn from(event: &ItemCreated) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            price: event.price,
            version: Version::new(event.version),
        }
    }
}

impl From<&ItemUpdated> for ItemReplica {
    fn from(event: &ItemUpdated) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            price: event.price,
            version: Version::new(event.version),
        }
    }
}

impl Document for ItemReplica {
    type Id = ItemId;
    const COLLECTION: &'static str = "item_replicas";

    fn id(&self) -> ItemId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}
