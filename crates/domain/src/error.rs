//! Service error taxonomy.

use document_store::StoreError;
use event_bus::BusError;
use thiserror::Error;

/// Errors returned by service operations.
///
/// This is the only error type callers of the services see; storage and
/// transport failures are translated here.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The addressed document does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("{0}")]
    Conflict(String),

    /// The requester does not own the addressed document.
    #[error("{0}")]
    Unauthorized(String),

    /// An infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                ServiceError::NotFound(format!("{collection}/{id} not found"))
            }
            StoreError::VersionConflict { collection, id, .. } => {
                ServiceError::Conflict(format!("{collection}/{id} was modified concurrently"))
            }
            StoreError::AlreadyExists { collection, id } => {
                ServiceError::Conflict(format!("{collection}/{id} already exists"))
            }
            StoreError::UniqueViolation { collection, key } => {
                ServiceError::Conflict(format!("{key} is already taken in {collection}"))
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<BusError> for ServiceError {
    fn from(err: BusError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
