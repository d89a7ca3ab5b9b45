//! Choreography of the purchase workflow.
//!
//! No coordinator drives the workflow. Each service reacts to the others'
//! events:
//! 1. The order service reserves an item and publishes `order:created`
//! 2. The item service points the item at the order; the payment service
//!    replicates the order
//! 3. The payment service charges and publishes `payment:created`
//! 4. The order service marks the order complete
//!
//! Cancellation flows the same way through `order:cancelled`.

pub mod error;
pub mod handlers;
pub mod platform;

pub use error::{ChoreographyError, Result};
pub use handlers::{PaymentCompletion, ReservationUpdater};
pub use platform::{Consumers, Items, Orders, Payments, Platform, Stores};
