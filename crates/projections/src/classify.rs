use document_store::{StoreError, Version};
use event_bus::HandlerError;

/// Classifies a failed replica write for an event at `incoming`.
pub fn classify_write_error(err: StoreError, incoming: Version) -> HandlerError {
    match err {
        StoreError::VersionConflict {
            collection, id, actual, ..
        } => {
            let kind = if actual >= incoming { "duplicate" } else { "gap" };
            metrics::counter!(
                "replica_version_conflicts_total",
                "collection" => collection,
                "kind" => kind
            )
            .increment(1);

            if actual >= incoming {
                HandlerError::Duplicate(format!(
                    "{collection}/{id} already at version {actual}, event is {incoming}"
                ))
            } else {
                HandlerError::OutOfOrder(format!(
                    "{collection}/{id} at version {actual}, event is {incoming}"
                ))
            }
        }
        StoreError::NotFound { collection, id } => {
            HandlerError::OutOfOrder(format!("{collection}/{id} not replicated yet"))
        }
        StoreError::AlreadyExists { collection, id } => {
            HandlerError::Duplicate(format!("{collection}/{id} already replicated"))
        }
        StoreError::UniqueViolation { collection, key } => {
            HandlerError::Rejected(format!("{key} already taken in {collection}"))
        }
        other => HandlerError::Transient(other.to_string()),
    }
}
