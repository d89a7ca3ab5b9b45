//! Types shared across the item, order and payment services.
//!
//! Services never share storage; the only things they agree on are
//! identifiers, the order status vocabulary, and the JSON shape of the
//! events they publish to each other.

pub mod messages;
pub mod status;
pub mod types;

pub use status::{OrderStatus, ParseOrderStatusError};
pub use types::{ChargeId, ItemId, OrderId, PaymentId, UserId};
