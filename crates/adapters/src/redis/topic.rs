// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{ensure_subscribed, RedisClient, Shared, Subscription, TopicEnvelope};
use crate::dispatch::Listeners;
use crate::store::TokenTable;
use bq_core::{
    DataError, DataResult, DistributedTopic, ListenerId, Message, MessageListener, Payload,
};
use std::sync::{Arc, Mutex};

/// Topic carried over Redis pub/sub; nothing is retained for late listeners
pub struct RedisTopic<T> {
    client: Arc<RedisClient>,
    name: String,
    channel: String,
    listeners: Shared<dyn MessageListener<T>>,
    subscription: Mutex<Option<Subscription>>,
    tokens: TokenTable,
}

impl<T: Payload> RedisTopic<T> {
    pub fn new(client: Arc<RedisClient>, name: &str) -> Self {
        Self {
            channel: client.channel("topic", name),
            client,
            name: name.to_string(),
            listeners: Arc::new(Listeners::new()),
            subscription: Mutex::new(None),
            tokens: TokenTable::default(),
        }
    }
}

impl<T: Payload> DistributedTopic<T> for RedisTopic<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, message: T) -> DataResult<()> {
        let envelope = TopicEnvelope {
            publisher: self.client.address().to_string(),
            payload: message,
        };
        let text = serde_json::to_string(&envelope)
            .map_err(|e| DataError::serialization(&self.name, e))?;
        let receivers: i64 = self
            .client
            .with_conn(|con| redis::cmd("PUBLISH").arg(&self.channel).arg(&text).query(con))?;
        tracing::trace!(topic = %self.name, receivers, "published");
        Ok(())
    }

    fn add_message_listener(
        &self,
        listener: Arc<dyn MessageListener<T>>,
    ) -> DataResult<ListenerId> {
        ensure_subscribed(&self.subscription, || {
            let listeners = Arc::clone(&self.listeners);
            let name = self.name.clone();
            self.client.subscribe(self.channel.clone(), move |payload| {
                let envelope = match serde_json::from_str::<TopicEnvelope<T>>(payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::error!(topic = %name, error = %e, "dropping undecodable message");
                        return;
                    }
                };
                for listener in listeners.snapshot() {
                    listener.on_message(Message {
                        topic: name.clone(),
                        payload: envelope.payload.clone(),
                        publisher: Some(envelope.publisher.clone()),
                    });
                }
            })
        })?;
        let native = self.listeners.add(self.client.address(), listener);
        Ok(self.tokens.insert(native))
    }

    fn remove_message_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !self.listeners.remove(native) {
                    tracing::debug!(topic = %self.name, %id, "listener already released");
                }
            }
            None => tracing::warn!(topic = %self.name, %id, "unknown listener id"),
        }
    }
}
