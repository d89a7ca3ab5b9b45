use std::sync::Arc;

use crate::Message;

/// Settles deliveries on behalf of the transport that produced them.
pub trait Acknowledger: Send + Sync {
    /// The message was processed and must not be delivered again.
    fn ack(&self, message: &Message, attempt: u32);

    /// The message should be delivered again later.
    fn nack(&self, message: &Message, attempt: u32);
}

/// One delivery of a message to one member of a queue group.
///
/// A delivery must be settled exactly once. Dropping it unsettled counts
/// as a `nack`, so a panicking or cancelled handler never loses a message.
pub struct Delivery {
    message: Message,
    attempt: u32,
    acker: Option<Arc<dyn Acknowledger>>,
}

impl Delivery {
    pub fn new(message: Message, attempt: u32, acker: Arc<dyn Acknowledger>) -> Self {
        Self {
            message,
            attempt,
            acker: Some(acker),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// 1 for the first delivery, incremented on every redelivery.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.ack(&self.message, self.attempt);
        }
    }

    pub fn nack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.nack(&self.message, self.attempt);
        }
    }

    /// Drops the delivery without settling it through the acknowledger.
    pub(crate) fn discard(mut self) {
        self.acker = None;
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(acker) = self.acker.take() {
            tracing::warn!(
                subject = %self.message.subject,
                message_id = %self.message.id,
                "delivery dropped without settlement"
            );
            acker.nack(&self.message, self.attempt);
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .field("attempt", &self.attempt)
            .field("settled", &self.acker.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        settled: Mutex<Vec<(&'static str, u32)>>,
    }

    impl Acknowledger for Recorder {
        fn ack(&self, _message: &Message, attempt: u32) {
            self.settled.lock().unwrap().push(("ack", attempt));
        }

        fn nack(&self, _message: &Message, attempt: u32) {
            self.settled.lock().unwrap().push(("nack", attempt));
        }
    }

    #[test]
    fn ack_settles_once() {
        let recorder = Arc::new(Recorder::default());
        let delivery = Delivery::new(Message::new("s", vec![]), 1, recorder.clone());
        delivery.ack();
        assert_eq!(*recorder.settled.lock().unwrap(), vec![("ack", 1)]);
    }

    #[test]
    fn nack_settles_once() {
        let recorder = Arc::new(Recorder::default());
        let delivery = Delivery::new(Message::new("s", vec![]), 3, recorder.clone());
        delivery.nack();
        assert_eq!(*recorder.settled.lock().unwrap(), vec![("nack", 3)]);
    }

    #[test]
    fn drop_unsettled_nacks() {
        let recorder = Arc::new(Recorder::default());
        drop(Delivery::new(Message::new("s", vec![]), 2, recorder.clone()));
        assert_eq!(*recorder.settled.lock().unwrap(), vec![("nack", 2)]);
    }
}
