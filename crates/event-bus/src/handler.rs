use async_trait::async_trait;
use thiserror::Error;

use crate::Message;

/// Why a handler did not apply a message.
///
/// The variant decides settlement: outcomes that redelivery cannot change
/// are acknowledged, the rest are redelivered.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The message was already applied.
    #[error("duplicate message: {0}")]
    Duplicate(String),

    /// The message conflicts with current state and will never apply.
    #[error("rejected message: {0}")]
    Rejected(String),

    /// A predecessor has not been applied yet.
    #[error("out-of-order message: {0}")]
    OutOfOrder(String),

    /// A failure that may succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl HandlerError {
    /// Returns true if the message should be delivered again.
    pub fn should_redeliver(&self) -> bool {
        matches!(self, HandlerError::OutOfOrder(_) | HandlerError::Transient(_))
    }

    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            HandlerError::Malformed(_) => "malformed",
            HandlerError::Duplicate(_) => "duplicate",
            HandlerError::Rejected(_) => "rejected",
            HandlerError::OutOfOrder(_) => "out_of_order",
            HandlerError::Transient(_) => "transient",
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Malformed(err.to_string())
    }
}

/// Processes messages from one subscription.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Stable name used in logs and metric labels.
    fn name(&self) -> &'static str;

    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}
