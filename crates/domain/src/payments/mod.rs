//! Payments and the order replica, owned by the payment service.

mod gateway;
mod model;
mod service;

pub use gateway::{GatewayError, InMemoryPaymentGateway, PaymentGateway};
pub use model::{OrderReplica, Payment};
pub use service::PaymentService;
