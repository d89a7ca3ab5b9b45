use thiserror::Error;

/// Errors that can occur when publishing or subscribing.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus has been shut down.
    #[error("Event bus closed")]
    Closed,

    /// A payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
