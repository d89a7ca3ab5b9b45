//! Choreography error types.

use thiserror::Error;

/// Errors that can occur while wiring services together.
#[derive(Debug, Error)]
pub enum ChoreographyError {
    /// Subscribing a consumer group failed.
    #[error("Event bus error: {0}")]
    Bus(#[from] event_bus::BusError),

    /// Preparing the store failed.
    #[error("Store error: {0}")]
    Store(#[from] document_store::StoreError),
}

/// Convenience type alias for choreography results.
pub type Result<T> = std::result::Result<T, ChoreographyError>;
