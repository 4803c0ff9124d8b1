// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Codec, DecodedMessages, Node, TokenTable};
use crate::memory::MemoryTopic;
use bq_core::{DataResult, DistributedTopic, ListenerId, MessageListener, Payload};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct StoreTopic<T, C: Codec<T>> {
    store: Arc<MemoryTopic<C::Stored>>,
    codec: C,
    node: Arc<dyn Node>,
    tokens: TokenTable,
    _message: PhantomData<fn() -> T>,
}

impl<T: Payload, C: Codec<T>> StoreTopic<T, C> {
    pub fn new(store: Arc<MemoryTopic<C::Stored>>, codec: C, node: Arc<dyn Node>) -> Self {
        Self {
            store,
            codec,
            node,
            tokens: TokenTable::default(),
            _message: PhantomData,
        }
    }
}

impl<T: Payload, C: Codec<T>> DistributedTopic<T> for StoreTopic<T, C> {
    fn name(&self) -> &str {
        self.store.name()
    }

    fn publish(&self, message: T) -> DataResult<()> {
        self.node.ensure_active()?;
        let payload = self.codec.encode(self.name(), &message)?;
        self.store
            .publish(payload, Some(self.node.address().to_string()));
        Ok(())
    }

    fn add_message_listener(
        &self,
        listener: Arc<dyn MessageListener<T>>,
    ) -> DataResult<ListenerId> {
        self.node.ensure_active()?;
        let decoded = Arc::new(DecodedMessages {
            codec: self.codec.clone(),
            inner: listener,
        });
        let native = self.store.add_message_listener(self.node.address(), decoded);
        Ok(self.tokens.insert(native))
    }

    fn remove_message_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !self.store.remove_listener(native) {
                    tracing::debug!(topic = self.name(), %id, "listener already released");
                }
            }
            None => tracing::warn!(topic = self.name(), %id, "unknown listener id"),
        }
    }
}
