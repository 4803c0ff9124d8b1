// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Codec, DecodedItems, Node, TokenTable};
use crate::memory::MemoryQueue;
use bq_core::{
    ChangeListener, DataResult, DistributedQueue, ItemListener, ListenerId, Payload,
};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct StoreQueue<T, C: Codec<T>> {
    store: Arc<MemoryQueue<C::Stored>>,
    codec: C,
    node: Arc<dyn Node>,
    tokens: TokenTable,
    _item: PhantomData<fn() -> T>,
}

impl<T: Payload, C: Codec<T>> StoreQueue<T, C> {
    pub fn new(store: Arc<MemoryQueue<C::Stored>>, codec: C, node: Arc<dyn Node>) -> Self {
        Self {
            store,
            codec,
            node,
            tokens: TokenTable::default(),
            _item: PhantomData,
        }
    }

    fn encode_all(&self, items: &[T]) -> DataResult<Vec<C::Stored>> {
        items
            .iter()
            .map(|item| self.codec.encode(self.store.name(), item))
            .collect()
    }

    fn decode(&self, stored: Option<C::Stored>) -> DataResult<Option<T>> {
        stored
            .map(|s| self.codec.decode(self.store.name(), &s))
            .transpose()
    }
}

impl<T: Payload, C: Codec<T>> DistributedQueue<T> for StoreQueue<T, C> {
    fn name(&self) -> &str {
        self.store.name()
    }

    fn add(&self, item: T) -> DataResult<bool> {
        self.node.ensure_active()?;
        let stored = self.codec.encode(self.name(), &item)?;
        self.store.add(stored);
        Ok(true)
    }

    fn add_all(&self, items: Vec<T>) -> DataResult<bool> {
        self.node.ensure_active()?;
        let stored = self.encode_all(&items)?;
        let changed = !stored.is_empty();
        self.store.add_all(stored);
        Ok(changed)
    }

    fn poll(&self) -> DataResult<Option<T>> {
        self.node.ensure_active()?;
        self.decode(self.store.poll())
    }

    fn peek(&self) -> DataResult<Option<T>> {
        self.node.ensure_active()?;
        self.decode(self.store.peek())
    }

    fn remove_all(&self, items: &[T]) -> DataResult<bool> {
        self.node.ensure_active()?;
        let targets = self.encode_all(items)?;
        Ok(self.store.remove_all(&targets))
    }

    fn get_all(&self) -> DataResult<Vec<T>> {
        self.node.ensure_active()?;
        self.store
            .snapshot()
            .iter()
            .map(|s| self.codec.decode(self.name(), s))
            .collect()
    }

    fn clear(&self) -> DataResult<()> {
        self.node.ensure_active()?;
        self.store.clear();
        Ok(())
    }

    fn size(&self) -> DataResult<usize> {
        self.node.ensure_active()?;
        Ok(self.store.len())
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<T>>) -> DataResult<ListenerId> {
        self.node.ensure_active()?;
        let decoded = Arc::new(DecodedItems {
            codec: self.codec.clone(),
            inner: listener,
        });
        let native = self.store.add_item_listener(self.node.address(), decoded);
        Ok(self.tokens.insert(native))
    }

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId> {
        self.node.ensure_active()?;
        let native = self.store.add_change_listener(self.node.address(), listener);
        Ok(self.tokens.insert(native))
    }

    fn remove_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !self.store.remove_listener(native) {
                    tracing::debug!(queue = self.name(), %id, "listener already released");
                }
            }
            None => tracing::warn!(queue = self.name(), %id, "unknown listener id"),
        }
    }
}
