//! Redis pub/sub-backed message topic (optional).
//!
//! Note: Redis pub/sub is not durable (messages can be dropped if subscribers
//! are offline). It is good enough for single-site deployments where the
//! manual full walk backfills anything missed; a durable broker slots in
//! behind the same trait later.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use serde_json::Value as JsonValue;

use printops_events::{MessageEnvelope, MessageTopic, Subscription};

#[derive(Debug)]
pub enum RedisTopicError {
    Redis(String),
    Serialize(String),
}

/// Redis pub/sub topic for JSON message envelopes.
#[derive(Debug, Clone)]
pub struct RedisPubSubTopic {
    client: redis::Client,
    channel: String,
}

impl RedisPubSubTopic {
    pub fn new(
        redis_url: impl AsRef<str>,
        channel: impl Into<String>,
    ) -> Result<Self, RedisTopicError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisTopicError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }
}

impl MessageTopic<MessageEnvelope<JsonValue>> for RedisPubSubTopic {
    type Error = RedisTopicError;

    fn publish(&self, message: MessageEnvelope<JsonValue>) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisTopicError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisTopicError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisTopicError::Redis(e.to_string()))?;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<MessageEnvelope<JsonValue>> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(_) => return,
            };

            let mut pubsub = conn.as_pubsub();
            if pubsub.subscribe(channel).is_err() {
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let envelope: MessageEnvelope<JsonValue> = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                if tx.send(envelope).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
