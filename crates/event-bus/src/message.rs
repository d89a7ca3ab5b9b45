use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// A message published on a subject.
///
/// The payload is opaque bytes on the wire; services exchange JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub subject: String,
    pub data: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message from raw bytes.
    pub fn new(subject: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            data,
            published_at: Utc::now(),
        }
    }

    /// Creates a message carrying `payload` encoded as JSON.
    pub fn json<T: Serialize>(
        subject: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(subject, serde_json::to_vec(payload)?))
    }

    /// Decodes the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}
