use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};

use crate::{Delivery, Message, Result};

/// Trait for event bus implementations.
///
/// Delivery is at-least-once. Subscribers must tolerate duplicates and
/// messages arriving out of order.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes a message to every queue group subscribed to its subject.
    ///
    /// May wait for queue capacity.
    async fn publish(&self, message: Message) -> Result<()>;

    /// Joins queue group `group` on `subject`.
    ///
    /// Subscribing twice with the same subject and group yields handles on
    /// the same queue, so their holders compete for messages.
    async fn subscribe(&self, subject: &str, group: &str) -> Result<Subscription>;
}

#[async_trait]
impl<T: EventBus + ?Sized> EventBus for Arc<T> {
    async fn publish(&self, message: Message) -> Result<()> {
        (**self).publish(message).await
    }

    async fn subscribe(&self, subject: &str, group: &str) -> Result<Subscription> {
        (**self).subscribe(subject, group).await
    }
}

/// Extension trait providing convenience methods for event buses.
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Encodes `payload` as JSON and publishes it on `subject`.
    async fn publish_json<T: Serialize + Sync>(&self, subject: &str, payload: &T) -> Result<()> {
        let message = Message::json(subject, payload)?;
        self.publish(message).await
    }
}

impl<T: EventBus + ?Sized> EventBusExt for T {}

/// A handle on one queue group's queue.
///
/// Clones share the queue; each delivery goes to exactly one of them.
#[derive(Clone)]
pub struct Subscription {
    subject: String,
    group: String,
    receiver: Arc<Mutex<mpsc::Receiver<Delivery>>>,
}

impl Subscription {
    pub fn new(
        subject: impl Into<String>,
        group: impl Into<String>,
        receiver: Arc<Mutex<mpsc::Receiver<Delivery>>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            group: group.into(),
            receiver,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Waits for the next delivery. Returns `None` once the bus is closed.
    ///
    /// Cancel safe: dropping the future never loses a delivery.
    pub async fn next(&self) -> Option<Delivery> {
        self.receiver.lock().await.recv().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("subject", &self.subject)
            .field("group", &self.group)
            .finish()
    }
}
