use common::messages::{ItemCreated, ItemUpdated};
use common::{ItemId, OrderId, UserId};
use document_store::{Document, Version};
use serde::{Deserialize, Serialize};

/// A sellable item (a ticket, a product).
///
/// `reserved_by` points at the one active order holding the item.
/// `cancelled_orders` remembers every order whose cancellation reached the
/// item, so a late `order:created` for one of them is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub price: i64,
    pub user_id: UserId,
    pub version: Version,
    pub reserved_by: Option<OrderId>,
    #[serde(default)]
    pub cancelled_orders: Vec<OrderId>,
}

impl Item {
    /// Creates an unreserved item at the initial version.
    pub fn new(user_id: UserId, title: impl Into<String>, price: i64) -> Self {
        Self {
            id: ItemId::new(),
            title: title.into(),
            price,
            user_id,
            version: Version::initial(),
            reserved_by: None,
            cancelled_orders: Vec::new(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved_by.is_some()
    }

    /// Returns true once `order:cancelled` for `order_id` has been applied.
    pub fn saw_cancellation_of(&self, order_id: OrderId) -> bool {
        self.cancelled_orders.contains(&order_id)
    }

    pub fn created_event(&self) -> ItemCreated {
        ItemCreated {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            version: self.version.as_i64(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn updated_event(&self) -> ItemUpdated {
        ItemUpdated {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            version: self.version.as_i64(),
            user_id: self.user_id.clone(),
        }
    }
}

impl Document for Item {
    type Id = ItemId;
    const COLLECTION: &'static str = "items";

    fn id(&self) -> ItemId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}
