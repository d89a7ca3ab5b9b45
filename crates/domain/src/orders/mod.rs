//! Orders and the item replica, owned by the order service.

mod model;
mod service;

pub use model::{ItemReplica, Order};
pub use service::OrderService;
