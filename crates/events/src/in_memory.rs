//! In-memory topic for tests/dev.

use std::sync::{Mutex, mpsc};

use crate::topic::{MessageTopic, Subscription};

#[derive(Debug)]
pub enum InMemoryTopicError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// In-memory pub/sub topic.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - At-least-once acceptable (subscribers must be idempotent)
///
/// Delivery happens in publish order on a single channel per subscriber, so
/// in-process it is also ordered per key trivially.
#[derive(Debug)]
pub struct InMemoryTopic<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryTopic<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryTopic<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> MessageTopic<M> for InMemoryTopic<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryTopicError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryTopicError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
