//! Replica synchronizers.
//!
//! A service that reads another service's aggregate keeps a read-only
//! replica, updated solely from the owner's events:
//! - [`ItemReplicaSync`] keeps the order service's item replica
//! - [`OrderReplicaSync`] keeps the payment service's order replica
//!
//! Each event carries the version the owner reached, so an update applies
//! only on top of the version right before it. Duplicates find the replica
//! already there; events that overtook their predecessor find a gap and are
//! redelivered until the predecessor has applied.

mod classify;
pub mod item_replica;
pub mod order_replica;

pub use classify::classify_write_error;
pub use item_replica::ItemReplicaSync;
pub use order_replica::OrderReplicaSync;
