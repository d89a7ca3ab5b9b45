//! At-least-once event bus with queue groups.
//!
//! Publishers put [`Message`]s on a subject. Every queue group subscribed to
//! the subject receives each message once, and the members of a group compete
//! for it. A handler settles each [`Delivery`] with `ack` or `nack`; a nacked
//! delivery comes back after a delay until the attempt cap is reached.

pub mod bus;
pub mod consumer;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod memory;
pub mod message;

pub use bus::{EventBus, EventBusExt, Subscription};
pub use consumer::ConsumerGroup;
pub use delivery::{Acknowledger, Delivery};
pub use error::{BusError, Result};
pub use handler::{HandlerError, MessageHandler};
pub use memory::{BusConfig, InMemoryEventBus};
pub use message::Message;
