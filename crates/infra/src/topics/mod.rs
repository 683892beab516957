//! Infrastructure topic implementations.
//!
//! The topic abstraction lives in `printops-events` as pure mechanics; this
//! module provides transport-backed implementations (e.g. Redis).

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisPubSubTopic, RedisTopicError};
