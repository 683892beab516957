//! `printops-events` — message-topic mechanics (transport-agnostic).
//!
//! The surrounding platform delivers messages at-least-once and unordered
//! except per ordering key. This crate holds only the mechanics: the message
//! contract, the envelope, the topic abstraction, and an in-memory topic for
//! tests/dev. Payload types live with their domains.

pub mod envelope;
pub mod in_memory;
pub mod message;
pub mod topic;

pub use envelope::MessageEnvelope;
pub use in_memory::{InMemoryTopic, InMemoryTopicError};
pub use message::Message;
pub use topic::{MessageTopic, Subscription};
