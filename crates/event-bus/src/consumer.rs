use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Delivery, EventBus, HandlerError, MessageHandler, Result, Subscription};

/// A fixed-size pool of workers draining one queue group subscription.
///
/// Workers compete for deliveries, run the handler, and settle each
/// delivery according to the handler's outcome: success and outcomes that
/// redelivery cannot change are acked, the rest are nacked.
pub struct ConsumerGroup {
    subscription: Subscription,
    handler: Arc<dyn MessageHandler>,
    workers: usize,
}

impl ConsumerGroup {
    /// Joins `group` on `subject` and prepares `workers` workers.
    pub async fn subscribe(
        bus: &dyn EventBus,
        subject: &str,
        group: &str,
        handler: Arc<dyn MessageHandler>,
        workers: usize,
    ) -> Result<Self> {
        let subscription = bus.subscribe(subject, group).await?;
        Ok(Self {
            subscription,
            handler,
            workers: workers.max(1),
        })
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Spawns the workers.
    ///
    /// Workers stop pulling once `shutdown` flips to `true` (or its sender
    /// is dropped). A handler that is already running finishes first.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        tracing::info!(
            handler = self.handler.name(),
            subject = self.subscription.subject(),
            group = self.subscription.group(),
            workers = self.workers,
            "starting consumer group"
        );

        (0..self.workers)
            .map(|worker| {
                let subscription = self.subscription.clone();
                let handler = Arc::clone(&self.handler);
                let shutdown = shutdown.clone();
                tokio::spawn(run_worker(worker, subscription, handler, shutdown))
            })
            .collect()
    }
}

async fn run_worker(
    worker: usize,
    subscription: Subscription,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let delivery = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            delivery = subscription.next() => delivery,
        };

        match delivery {
            Some(delivery) => process(handler.as_ref(), delivery).await,
            None => break,
        }
    }

    tracing::debug!(handler = handler.name(), worker, "consumer worker stopped");
}

#[tracing::instrument(
    skip_all,
    fields(
        handler = handler.name(),
        subject = %delivery.message().subject,
        message_id = %delivery.message().id,
        attempt = delivery.attempt()
    )
)]
async fn process(handler: &dyn MessageHandler, delivery: Delivery) {
    let started = Instant::now();
    let result = handler.handle(delivery.message()).await;

    metrics::histogram!("consumer_handle_seconds", "handler" => handler.name())
        .record(started.elapsed().as_secs_f64());

    let outcome = match &result {
        Ok(()) => "ok",
        Err(e) => e.outcome(),
    };
    metrics::counter!(
        "consumer_messages_total",
        "handler" => handler.name(),
        "outcome" => outcome
    )
    .increment(1);

    match result {
        Ok(()) => {
            tracing::debug!("message handled");
            delivery.ack();
        }
        Err(e) if e.should_redeliver() => {
            tracing::warn!(error = %e, "message will be redelivered");
            delivery.nack();
        }
        Err(e) => {
            match &e {
                HandlerError::Duplicate(_) => tracing::debug!(error = %e, "message skipped"),
                _ => tracing::warn!(error = %e, "message dropped"),
            }
            delivery.ack();
        }
    }
}
