use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write named a version the document is no longer at.
    #[error(
        "Version conflict for {collection}/{id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        collection: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// The document does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: String },

    /// A document with the same id already exists.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: &'static str, id: String },

    /// Another document already holds the unique key.
    #[error("Unique key {key} already held in {collection}")]
    UniqueViolation { collection: &'static str, key: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns the version the document is actually at, for version conflicts.
    pub fn actual_version(&self) -> Option<Version> {
        match self {
            StoreError::VersionConflict { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
