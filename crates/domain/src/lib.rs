//! Domain layer for the reservation workflow.
//!
//! This crate provides the three services and the documents they own:
//! - [`ItemService`] owns canonical items and their reservation pointer
//! - [`OrderService`] owns orders and keeps a replica of items
//! - [`PaymentService`] owns payments and keeps a replica of orders
//!
//! Services translate store failures into [`ServiceError`] and publish an
//! event after every accepted change.

pub mod error;
mod events;
pub mod items;
pub mod orders;
pub mod outcome;
pub mod payments;

pub use error::ServiceError;
pub use items::{Item, ItemService};
pub use orders::{ItemReplica, Order, OrderService};
pub use outcome::Outcome;
pub use payments::{
    GatewayError, InMemoryPaymentGateway, OrderReplica, Payment, PaymentGateway, PaymentService,
};
