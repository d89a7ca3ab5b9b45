use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use event_bus::{
    BusConfig, ConsumerGroup, EventBus, EventBusExt, HandlerError, InMemoryEventBus, Message,
    MessageHandler,
};
use tokio::sync::{Mutex, watch};
use tokio::time::timeout;

fn fast_bus(capacity: usize, max_deliveries: u32) -> InMemoryEventBus {
    InMemoryEventBus::new(BusConfig {
        queue_capacity: capacity,
        max_deliveries,
        redelivery_delay: Duration::from_millis(10),
        record_published: true,
    })
}

#[tokio::test]
async fn every_group_receives_each_message() {
    let bus = fast_bus(8, 3);
    let items = bus.subscribe("order:created", "items").await.unwrap();
    let payments = bus.subscribe("order:created", "payments").await.unwrap();

    bus.publish_json("order:created", &serde_json::json!({"id": 1}))
        .await
        .unwrap();

    let a = items.next().await.unwrap();
    let b = payments.next().await.unwrap();
    assert_eq!(a.message().id, b.message().id);
    assert_eq!(a.attempt(), 1);
    a.ack();
    b.ack();

    timeout(Duration::from_secs(1), bus.wait_until_idle())
        .await
        .unwrap();
}

#[tokio::test]
async fn members_of_a_group_compete() {
    let bus = fast_bus(16, 3);
    let first = bus.subscribe("s", "g").await.unwrap();
    let second = bus.subscribe("s", "g").await.unwrap();

    for i in 0..4 {
        bus.publish_json("s", &i).await.unwrap();
    }

    let mut seen = HashSet::new();
    for sub in [&first, &second, &first, &second] {
        let delivery = sub.next().await.unwrap();
        assert!(seen.insert(delivery.message().decode::<i32>().unwrap()));
        delivery.ack();
    }
    assert_eq!(seen.len(), 4);
    assert_eq!(bus.in_flight(), 0);
}

#[tokio::test]
async fn nack_redelivers_with_next_attempt() {
    let bus = fast_bus(8, 3);
    let sub = bus.subscribe("s", "g").await.unwrap();
    bus.publish(Message::new("s", b"x".to_vec())).await.unwrap();

    let first = sub.next().await.unwrap();
    let id = first.message().id;
    first.nack();

    let second = timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.message().id, id);
    assert_eq!(second.attempt(), 2);
    second.ack();
    timeout(Duration::from_secs(1), bus.wait_until_idle())
        .await
        .unwrap();
}

#[tokio::test]
async fn dropped_delivery_is_redelivered() {
    let bus = fast_bus(8, 3);
    let sub = bus.subscribe("s", "g").await.unwrap();
    bus.publish(Message::new("s", vec![])).await.unwrap();

    drop(sub.next().await.unwrap());

    let again = timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.attempt(), 2);
    again.ack();
}

#[tokio::test]
async fn gives_up_after_max_deliveries() {
    let bus = fast_bus(8, 2);
    let sub = bus.subscribe("s", "g").await.unwrap();
    bus.publish(Message::new("s", vec![])).await.unwrap();

    sub.next().await.unwrap().nack();
    let last = timeout(Duration::from_secs(1), sub.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.attempt(), 2);
    last.nack();

    timeout(Duration::from_secs(1), bus.wait_until_idle())
        .await
        .unwrap();
    assert!(
        timeout(Duration::from_millis(50), sub.next())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn publish_waits_for_queue_capacity() {
    let bus = fast_bus(1, 3);
    let sub = bus.subscribe("s", "g").await.unwrap();
    bus.publish(Message::new("s", vec![1])).await.unwrap();

    let blocked = timeout(
        Duration::from_millis(50),
        bus.publish(Message::new("s", vec![2])),
    )
    .await;
    assert!(blocked.is_err(), "second publish should wait for capacity");

    // The timed-out publish was cancelled before it could enqueue.
    let delivery = sub.next().await.unwrap();
    assert_eq!(delivery.message().data, vec![1]);
    delivery.ack();

    timeout(
        Duration::from_millis(200),
        bus.publish(Message::new("s", vec![3])),
    )
    .await
    .unwrap()
    .unwrap();
    sub.next().await.unwrap().ack();
}

#[tokio::test]
async fn published_log_is_queryable() {
    let bus = InMemoryEventBus::recording();
    bus.publish_json("a", &1).await.unwrap();
    bus.publish_json("b", &2).await.unwrap();
    bus.publish_json("a", &3).await.unwrap();

    assert_eq!(bus.published_events::<i32>("a").await, vec![1, 3]);
    assert_eq!(bus.published("b").await.len(), 1);
    // Nothing subscribed, so nothing is in flight.
    assert_eq!(bus.in_flight(), 0);
}

/// Fails the first `failures` deliveries with `error`, then succeeds.
struct Flaky {
    failures: u32,
    transient: bool,
    calls: AtomicU32,
    handled: Mutex<Vec<Vec<u8>>>,
}

impl Flaky {
    fn new(failures: u32, transient: bool) -> Arc<Self> {
        Arc::new(Self {
            failures,
            transient,
            calls: AtomicU32::new(0),
            handled: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MessageHandler for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(if self.transient {
                HandlerError::Transient("not yet".into())
            } else {
                HandlerError::Rejected("never".into())
            });
        }
        self.handled.lock().await.push(message.data.clone());
        Ok(())
    }
}

#[tokio::test]
async fn consumer_group_retries_transient_failures() {
    let bus = fast_bus(8, 5);
    let handler = Flaky::new(2, true);
    let group = ConsumerGroup::subscribe(&bus, "s", "g", handler.clone(), 3)
        .await
        .unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = group.spawn(shutdown_rx);

    bus.publish(Message::new("s", vec![9])).await.unwrap();
    timeout(Duration::from_secs(2), bus.wait_until_idle())
        .await
        .unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    assert_eq!(*handler.handled.lock().await, vec![vec![9]]);

    shutdown_tx.send(true).unwrap();
    for worker in workers {
        timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn consumer_group_acks_rejections_without_retry() {
    let bus = fast_bus(8, 5);
    let handler = Flaky::new(1, false);
    let group = ConsumerGroup::subscribe(&bus, "s", "g", handler.clone(), 2)
        .await
        .unwrap();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    group.spawn(shutdown_rx);

    bus.publish(Message::new("s", vec![1])).await.unwrap();
    timeout(Duration::from_secs(2), bus.wait_until_idle())
        .await
        .unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert!(handler.handled.lock().await.is_empty());
}

#[tokio::test]
async fn workers_stop_when_shutdown_sender_drops() {
    let bus = fast_bus(8, 5);
    let group = ConsumerGroup::subscribe(&bus, "s", "g", Flaky::new(0, true), 4)
        .await
        .unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = group.spawn(shutdown_rx);
    assert_eq!(workers.len(), 4);

    drop(shutdown_tx);
    for worker in workers {
        timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
