use common::{OrderId, OrderStatus, UserId};
use document_store::{Filter, StoreError, StoreExt, VersionedStore};
use event_bus::EventBus;

use crate::events::publish;
use crate::{OrderReplica, Payment, PaymentGateway, ServiceError};

/// Service owning payments.
///
/// Reads orders from its replica, which trails the order service.
pub struct PaymentService<P, R, B, G> {
    payments: P,
    orders: R,
    bus: B,
    gateway: G,
}

impl<P, R, B, G> PaymentService<P, R, B, G>
where
    P: VersionedStore<Payment>,
    R: VersionedStore<OrderReplica>,
    B: EventBus,
    G: PaymentGateway,
{
    /// Creates a new payment service.
    pub fn new(payments: P, orders: R, bus: B, gateway: G) -> Self {
        Self {
            payments,
            orders,
            bus,
            gateway,
        }
    }

    /// Charges the order's amount and records the payment.
    ///
    /// A gateway failure leaves the order unpaid and is not retried.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, order_id: OrderId, user_id: &UserId) -> Result<Payment, ServiceError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id} not found")))?;

        if order.user_id != *user_id {
            return Err(ServiceError::Unauthorized(format!(
                "order {order_id} belongs to another user"
            )));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::Conflict(
                "cannot pay a cancelled order".to_string(),
            ));
        }
        if self
            .payments
            .any(&Filter::new().eq("order_id", order_id))
            .await?
        {
            return Err(ServiceError::Conflict("order is already paid".to_string()));
        }

        let charge_id = self
            .gateway
            .charge(order.charge, &order_id.to_string())
            .await
            .map_err(|e| {
                metrics::counter!("payment_failures_total").increment(1);
                tracing::warn!(%order_id, error = %e, "charge failed");
                ServiceError::Internal(e.to_string())
            })?;

        let payment = Payment::new(order_id, charge_id);
        match self.payments.insert(&payment).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation { .. }) => {
                tracing::error!(%order_id, charge_id = %payment.charge_id, "order paid concurrently, charge left unrecorded");
                return Err(ServiceError::Conflict("order is already paid".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        publish(&self.bus, &payment.created_event()).await?;

        metrics::counter!("payments_created_total").increment(1);
        tracing::info!(%order_id, payment_id = %payment.id, "payment created");
        Ok(payment)
    }
}
