use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, Notify, RwLock, mpsc};

use crate::{Acknowledger, Delivery, EventBus, Message, Result, Subscription};

/// Delivery settings for [`InMemoryEventBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Capacity of each queue group's queue. Publishers wait when it is full.
    pub queue_capacity: usize,

    /// Total attempts before a repeatedly nacked message is dropped.
    pub max_deliveries: u32,

    /// Delay before a nacked message is delivered again.
    pub redelivery_delay: Duration,

    /// Keep every published message in a queryable log. Off by default;
    /// the log is never trimmed, so only tests should switch it on.
    pub record_published: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_deliveries: 5,
            redelivery_delay: Duration::from_millis(500),
            record_published: false,
        }
    }
}

/// Counts deliveries that have not been settled for good.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Settles deliveries of one queue group.
struct GroupAcker {
    subject: String,
    group: String,
    config: BusConfig,
    sender: mpsc::WeakSender<Delivery>,
    in_flight: Arc<InFlight>,
    me: Weak<GroupAcker>,
}

impl Acknowledger for GroupAcker {
    fn ack(&self, message: &Message, attempt: u32) {
        tracing::trace!(subject = %self.subject, group = %self.group, message_id = %message.id, attempt, "acked");
        self.in_flight.done();
    }

    fn nack(&self, message: &Message, attempt: u32) {
        if attempt >= self.config.max_deliveries {
            tracing::error!(
                subject = %self.subject,
                group = %self.group,
                message_id = %message.id,
                attempt,
                "giving up on message after max deliveries"
            );
            metrics::counter!(
                "bus_messages_dead_lettered_total",
                "subject" => self.subject.clone(),
                "group" => self.group.clone()
            )
            .increment(1);
            self.in_flight.done();
            return;
        }

        let (Ok(runtime), Some(sender), Some(acker)) = (
            tokio::runtime::Handle::try_current(),
            self.sender.upgrade(),
            self.me.upgrade(),
        ) else {
            tracing::warn!(subject = %self.subject, message_id = %message.id, "bus gone, dropping nacked message");
            self.in_flight.done();
            return;
        };

        tracing::debug!(subject = %self.subject, group = %self.group, message_id = %message.id, attempt, "scheduling redelivery");
        let message = message.clone();
        let delay = self.config.redelivery_delay;
        let in_flight = Arc::clone(&self.in_flight);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let delivery = Delivery::new(message, attempt + 1, acker);
            if let Err(mpsc::error::SendError(delivery)) = sender.send(delivery).await {
                delivery.discard();
                in_flight.done();
            }
        });
    }
}

struct Queue {
    sender: mpsc::Sender<Delivery>,
    receiver: Arc<Mutex<mpsc::Receiver<Delivery>>>,
    acker: Arc<GroupAcker>,
}

struct Inner {
    config: BusConfig,
    queues: RwLock<HashMap<(String, String), Queue>>,
    published: RwLock<Vec<Message>>,
    in_flight: Arc<InFlight>,
}

/// In-process event bus with one bounded queue per (subject, group).
///
/// Messages published before any group subscribed to their subject are
/// dropped. Subscribe every consumer before serving traffic.
///
/// A settled message is not retained unless
/// [`BusConfig::record_published`] is set.
#[derive(Clone)]
pub struct InMemoryEventBus {
    inner: Arc<Inner>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl InMemoryEventBus {
    /// Creates a new bus with the given delivery settings.
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                queues: RwLock::new(HashMap::new()),
                published: RwLock::new(Vec::new()),
                in_flight: Arc::new(InFlight::default()),
            }),
        }
    }

    /// Creates a bus with default settings that records every published
    /// message.
    pub fn recording() -> Self {
        Self::new(BusConfig {
            record_published: true,
            ..BusConfig::default()
        })
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns every message published on `subject`, oldest first. Always
    /// empty unless the bus records published messages.
    pub async fn published(&self, subject: &str) -> Vec<Message> {
        self.inner
            .published
            .read()
            .await
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Returns the decodable payloads published on `subject`, oldest first.
    pub async fn published_events<T: DeserializeOwned>(&self, subject: &str) -> Vec<T> {
        self.published(subject)
            .await
            .iter()
            .filter_map(|m| m.decode().ok())
            .collect()
    }

    /// Number of deliveries not yet acked or given up on.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.current()
    }

    /// Waits until every delivery has been acked or given up on, including
    /// pending redeliveries and messages their handlers published.
    pub async fn wait_until_idle(&self) {
        self.inner.in_flight.wait_idle().await;
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, message: Message) -> Result<()> {
        if self.inner.config.record_published {
            self.inner.published.write().await.push(message.clone());
        }

        let targets: Vec<(mpsc::Sender<Delivery>, Arc<GroupAcker>)> = {
            let queues = self.inner.queues.read().await;
            queues
                .iter()
                .filter(|((subject, _), _)| *subject == message.subject)
                .map(|(_, q)| (q.sender.clone(), Arc::clone(&q.acker)))
                .collect()
        };

        if targets.is_empty() {
            tracing::debug!(subject = %message.subject, "no queue group subscribed");
        }

        for (sender, acker) in targets {
            // Reserve first so a cancelled publish leaves nothing half-sent.
            let Ok(permit) = sender.reserve().await else {
                tracing::warn!(subject = %message.subject, "queue closed, skipping group");
                continue;
            };
            self.inner.in_flight.begin();
            permit.send(Delivery::new(message.clone(), 1, acker));
        }

        metrics::counter!("bus_messages_published_total", "subject" => message.subject.clone())
            .increment(1);
        Ok(())
    }

    async fn subscribe(&self, subject: &str, group: &str) -> Result<Subscription> {
        let mut queues = self.inner.queues.write().await;
        let key = (subject.to_string(), group.to_string());
        let queue = queues.entry(key).or_insert_with(|| {
            let (sender, receiver) = mpsc::channel(self.inner.config.queue_capacity.max(1));
            let weak = sender.downgrade();
            let acker = Arc::new_cyclic(|me| GroupAcker {
                subject: subject.to_string(),
                group: group.to_string(),
                config: self.inner.config.clone(),
                sender: weak,
                in_flight: Arc::clone(&self.inner.in_flight),
                me: me.clone(),
            });
            tracing::debug!(subject, group, "queue group created");
            Queue {
                sender,
                receiver: Arc::new(Mutex::new(receiver)),
                acker,
            }
        });

        Ok(Subscription::new(
            subject,
            group,
            Arc::clone(&queue.receiver),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventBusExt;

    #[tokio::test]
    async fn settled_messages_are_not_retained() {
        let bus = InMemoryEventBus::default();
        let sub = bus.subscribe("order:created", "items").await.unwrap();

        for n in 0..2000 {
            bus.publish_json("order:created", &n).await.unwrap();
            sub.next().await.unwrap().ack();
        }
        bus.wait_until_idle().await;

        assert_eq!(bus.in_flight(), 0);
        assert!(bus.inner.published.read().await.is_empty());
        assert!(bus.published("order:created").await.is_empty());
    }

    #[tokio::test]
    async fn unsubscribed_subjects_are_not_retained() {
        let bus = InMemoryEventBus::default();
        for n in 0..100 {
            bus.publish_json("nobody:listens", &n).await.unwrap();
        }
        assert!(bus.inner.published.read().await.is_empty());
    }

    #[tokio::test]
    async fn recording_bus_keeps_the_log() {
        let bus = InMemoryEventBus::recording();
        bus.publish_json("a", &1).await.unwrap();
        assert_eq!(bus.published_events::<i32>("a").await, vec![1]);
    }
}
