use common::messages::{OrderCreated, PaymentCreated};
use common::{ChargeId, OrderId, OrderStatus, PaymentId, UserId};
use document_store::{Document, Version};
use serde::{Deserialize, Serialize};

/// The payment service's read-only copy of an order.
///
/// Cancelled orders stay here, marked cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReplica {
    pub id: OrderId,
    pub user_id: UserId,
    pub charge: i64,
    pub status: OrderStatus,
    pub version: Version,
}

impl From<&OrderCreated> for OrderReplica {
    fn from(event: &OrderCreated) -> Self {
        Self {
            id: event.id,
            user_id: event.user_id.clone(),
            charge: event.charge,
            status: event.status,
            version: Version::new(event.version),
        }
    }
}

impl Document for OrderReplica {
    type Id = OrderId;
    const COLLECTION: &'static str = "order_replicas";

    fn id(&self) -> OrderId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// A successful charge for an order. Never modified after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub charge_id: ChargeId,
    pub version: Version,
}

impl Payment {
    pub fn new(order_id: OrderId, charge_id: ChargeId) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            charge_id,
            version: Version::initial(),
        }
    }

    pub fn created_event(&self) -> PaymentCreated {
        PaymentCreated {
            id: self.id,
            order_id: self.order_id,
            charge_id: self.charge_id.clone(),
        }
    }
}

impl Document for Payment {
    type Id = PaymentId;
    const COLLECTION: &'static str = "payments";

    fn id(&self) -> PaymentId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    /// One payment per order.
    fn unique_key(&self) -> Option<String> {
        Some(format!("order:{}", self.order_id))
    }
}
