use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Envelope for a published message.
///
/// Notes:
/// - `message_id` identifies one publication; redelivery repeats it, so
///   consumers can deduplicate on it when they need to.
/// - `ordering_key` is the only ordering the platform honors (per key).
/// - `payload` is the domain payload, opaque to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope<M> {
    message_id: Uuid,
    ordering_key: Option<String>,
    published_at: DateTime<Utc>,
    payload: M,
}

impl<M> MessageEnvelope<M> {
    pub fn new(
        message_id: Uuid,
        ordering_key: Option<String>,
        published_at: DateTime<Utc>,
        payload: M,
    ) -> Self {
        Self {
            message_id,
            ordering_key,
            published_at,
            payload,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn ordering_key(&self) -> Option<&str> {
        self.ordering_key.as_deref()
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn payload(&self) -> &M {
        &self.payload
    }

    pub fn into_payload(self) -> M {
        self.payload
    }
}

impl<M: Message> MessageEnvelope<M> {
    /// Wrap a payload, deriving the ordering key from the message itself.
    pub fn wrap(payload: M) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            ordering_key: payload.ordering_key(),
            published_at: Utc::now(),
            payload,
        }
    }
}
