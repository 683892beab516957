//! Message publishing/subscription abstraction (mechanics only).
//!
//! The topic is intentionally **lightweight** and makes minimal assumptions:
//!
//! - **Transport-agnostic**: works with in-memory channels, Redis pub/sub, a
//!   managed message topic, etc.
//! - **At-least-once delivery**: messages may be redelivered; consumers must
//!   be idempotent (the reconciliation engine and all cascade stages are).
//! - **No ordering across keys**: only messages sharing an ordering key are
//!   delivered in order, and only when the implementation supports it.
//! - **No persistence**: the topic distributes; documents are the state.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a topic.
///
/// Each subscription receives a copy of every message published after it was
/// created (broadcast semantics). Designed for single-threaded consumption;
/// one worker owns one subscription.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic message topic (pub/sub abstraction).
///
/// Sits between producers (the reconciliation applier, the admin API) and
/// consumers (workers driving the engine and the cascade). Publication can
/// fail; since consumers are idempotent, the caller may simply publish again.
pub trait MessageTopic<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, T> MessageTopic<M> for Arc<T>
where
    T: MessageTopic<M> + ?Sized,
{
    type Error = T::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
