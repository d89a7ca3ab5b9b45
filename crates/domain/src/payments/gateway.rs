//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ChargeId;
use thiserror::Error;

/// Errors reported by a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("charge declined: {0}")]
    Declined(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Charges money against an external provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` (minor units) and tags the charge with `reference`.
    async fn charge(&self, amount: i64, reference: &str) -> Result<ChargeId, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn charge(&self, amount: i64, reference: &str) -> Result<ChargeId, GatewayError> {
        (**self).charge(amount, reference).await
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    charges: HashMap<String, (String, i64)>,
    next_id: u32,
    fail_on_charge: bool,
}

/// In-memory payment gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every charge while `fail` is set.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.write().fail_on_charge = fail;
    }

    /// Returns the number of successful charges.
    pub fn charge_count(&self) -> usize {
        self.read().charges.len()
    }

    /// Returns the amounts charged under `reference`.
    pub fn charges_for(&self, reference: &str) -> Vec<i64> {
        self.read()
            .charges
            .values()
            .filter(|(r, _)| r == reference)
            .map(|(_, amount)| *amount)
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryGatewayState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(&self, amount: i64, reference: &str) -> Result<ChargeId, GatewayError> {
        let mut state = self.write();

        if state.fail_on_charge {
            return Err(GatewayError::Declined("card declined".to_string()));
        }

        state.next_id += 1;
        let charge_id = format!("ch_{:04}", state.next_id);
        state
            .charges
            .insert(charge_id.clone(), (reference.to_string(), amount));

        Ok(ChargeId::new(charge_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_records_reference() {
        let gateway = InMemoryPaymentGateway::new();

        let charge = gateway.charge(5000, "order-1").await.unwrap();
        assert!(charge.as_str().starts_with("ch_"));
        assert_eq!(gateway.charge_count(), 1);
        assert_eq!(gateway.charges_for("order-1"), vec![5000]);
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_charge(true);

        let result = gateway.charge(5000, "order-1").await;
        assert!(matches!(result, Err(GatewayError::Declined(_))));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_charge_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let c1 = gateway.charge(1000, "a").await.unwrap();
        let c2 = gateway.charge(1000, "b").await.unwrap();

        assert_eq!(c1.as_str(), "ch_0001");
        assert_eq!(c2.as_str(), "ch_0002");
    }
}
