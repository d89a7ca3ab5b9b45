//! Order replica kept by the payment service.

use async_trait::async_trait;
use common::OrderStatus;
use common::messages::{OrderCancelled, OrderCreated, subjects};
use document_store::{Version, VersionedStore};
use domain::OrderReplica;
use event_bus::{HandlerError, Message, MessageHandler};

use crate::classify_write_error;

/// Applies `order:created` and `order:cancelled` to the order replica.
///
/// Cancelled orders are marked, never removed.
pub struct OrderReplicaSync<S> {
    replicas: S,
}

impl<S: VersionedStore<OrderReplica>> OrderReplicaSync<S> {
    pub fn new(replicas: S) -> Self {
        Self { replicas }
    }

    #[tracing::instrument(skip(self, event), fields(order_id = %event.id, version = event.version))]
    pub async fn apply_created(&self, event: &OrderCreated) -> Result<(), HandlerError> {
        let replica = OrderReplica::from(event);
        self.replicas
            .insert(&replica)
            .await
            .map_err(|e| classify_write_error(e, replica.version))?;

        tracing::debug!("order replica created");
        Ok(())
    }

    #[tracing::instrument(skip(self, event), fields(order_id = %event.id, version = event.version))]
    pub async fn apply_cancelled(&self, event: &OrderCancelled) -> Result<(), HandlerError> {
        let incoming = Version::new(event.version);
        let Some(expected) = incoming.previous() else {
            return Err(HandlerError::Rejected(format!(
                "order {} cancelled at version {}",
                event.id, event.version
            )));
        };

        let current = self
            .replicas
            .get(event.id)
            .await
            .map_err(|e| HandlerError::Transient(e.to_string()))?
            .ok_or_else(|| HandlerError::OutOfOrder(format!("order {} not replicated yet", event.id)))?;

        let cancelled = OrderReplica {
            status: OrderStatus::Cancelled,
            version: incoming,
            ..current
        };
        self.replicas
            .put_if_version(&cancelled, expected)
            .await
            .map_err(|e| classify_write_error(e, incoming))?;

        tracing::debug!("order replica cancelled");
        Ok(())
    }
}

#[async_trait]
impl<S: VersionedStore<OrderReplica>> MessageHandler for OrderReplicaSync<S> {
    fn name(&self) -> &'static str {
        "order_replica_sync"
    }

    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        match message.subject.as_str() {
            subjects::ORDER_CREATED => self.apply_created(&message.decode()?).await,
            subjects::ORDER_CANCELLED => self.apply_cancelled(&message.decode()?).await,
            other => Err(HandlerError::Rejected(format!("unexpected subject {other}"))),
        }
    }
}
