// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Codec, DecodedItems, Node, TokenTable};
use crate::memory::MemorySet;
use bq_core::{DataResult, DistributedSet, ItemListener, Key, ListenerId};
use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct StoreSet<E, C: Codec<E>> {
    store: Arc<MemorySet<C::Stored>>,
    codec: C,
    node: Arc<dyn Node>,
    tokens: TokenTable,
    _element: PhantomData<fn() -> E>,
}

impl<E: Key, C: Codec<E>> StoreSet<E, C>
where
    C::Stored: Eq + Hash,
{
    pub fn new(store: Arc<MemorySet<C::Stored>>, codec: C, node: Arc<dyn Node>) -> Self {
        Self {
            store,
            codec,
            node,
            tokens: TokenTable::default(),
            _element: PhantomData,
        }
    }

    fn encode_all(&self, elements: &[E]) -> DataResult<Vec<C::Stored>> {
        elements
            .iter()
            .map(|e| self.codec.encode(self.store.name(), e))
            .collect()
    }
}

impl<E: Key, C: Codec<E>> DistributedSet<E> for StoreSet<E, C>
where
    C::Stored: Eq + Hash,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn add(&self, element: E) -> DataResult<bool> {
        self.add_all(vec![element])
    }

    fn add_all(&self, elements: Vec<E>) -> DataResult<bool> {
        self.node.ensure_active()?;
        let stored = self.encode_all(&elements)?;
        Ok(self.store.add_all(stored))
    }

    fn remove(&self, element: &E) -> DataResult<bool> {
        self.remove_all(std::slice::from_ref(element))
    }

    fn remove_all(&self, elements: &[E]) -> DataResult<bool> {
        self.node.ensure_active()?;
        let targets = self.encode_all(elements)?;
        Ok(self.store.remove_all(&targets))
    }

    fn contains(&self, element: &E) -> DataResult<bool> {
        self.contains_all(std::slice::from_ref(element))
    }

    fn contains_all(&self, elements: &[E]) -> DataResult<bool> {
        self.node.ensure_active()?;
        let targets = self.encode_all(elements)?;
        Ok(self.store.read(|set| targets.iter().all(|t| set.contains(t))))
    }

    fn size(&self) -> DataResult<usize> {
        self.node.ensure_active()?;
        Ok(self.store.read(|set| set.len()))
    }

    fn clear(&self) -> DataResult<()> {
        self.node.ensure_active()?;
        self.store.clear();
        Ok(())
    }

    fn set_copy(&self) -> DataResult<HashSet<E>> {
        self.node.ensure_active()?;
        let stored: Vec<C::Stored> = self.store.read(|set| set.iter().cloned().collect());
        stored
            .iter()
            .map(|s| self.codec.decode(self.name(), s))
            .collect()
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<E>>) -> DataResult<ListenerId> {
        self.node.ensure_active()?;
        let decoded = Arc::new(DecodedItems {
            codec: self.codec.clone(),
            inner: listener,
        });
        let native = self.store.add_item_listener(self.node.address(), decoded);
        Ok(self.tokens.insert(native))
    }

    fn remove_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !self.store.remove_listener(native) {
                    tracing::debug!(set = self.name(), %id, "listener already released");
                }
            }
            None => tracing::warn!(set = self.name(), %id, "unknown listener id"),
        }
    }
}
