// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed primitives over the in-process stores
//!
//! A [`Codec`] decides how values are held: the local backend keeps them as
//! they are, the grid backend keeps serialized bytes as a remote member would.

mod map;
mod queue;
mod set;
mod topic;

pub use map::StoreMap;
pub use queue::StoreQueue;
pub use set::StoreSet;
pub use topic::StoreTopic;

use crate::memory::{MemoryMap, MemoryQueue, MemorySet, MemoryTopic, Order, Registry, StoreKind};
use bq_core::{
    DataError, DataResult, DistributedMap, DistributedQueue, DistributedSet, DistributedTopic,
    HolderId, ItemEvent, ItemListener, Key, ListenerId, LockConfig, Message, MessageListener,
    Payload,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// How typed values are represented inside a store
pub trait Codec<T>: Clone + Send + Sync + 'static {
    type Stored: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn encode(&self, name: &str, value: &T) -> DataResult<Self::Stored>;

    fn decode(&self, name: &str, stored: &Self::Stored) -> DataResult<T>;
}

/// Values are stored as they are
#[derive(Clone, Copy, Debug, Default)]
pub struct Direct;

/// Values are stored as JSON bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl<T: Payload> Codec<T> for Direct {
    type Stored = T;

    fn encode(&self, _name: &str, value: &T) -> DataResult<T> {
        Ok(value.clone())
    }

    fn decode(&self, _name: &str, stored: &T) -> DataResult<T> {
        Ok(stored.clone())
    }
}

impl<T: Payload> Codec<T> for Json {
    type Stored = Vec<u8>;

    fn encode(&self, name: &str, value: &T) -> DataResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| DataError::serialization(name, e))
    }

    fn decode(&self, name: &str, stored: &Vec<u8>) -> DataResult<T> {
        serde_json::from_slice(stored).map_err(|e| DataError::serialization(name, e))
    }
}

/// The member a typed handle acts for
pub trait Node: Send + Sync + 'static {
    fn address(&self) -> &str;

    /// Fails when the member cannot reach its data
    fn ensure_active(&self) -> DataResult<()>;

    fn holder(&self) -> HolderId {
        HolderId::current_thread(self.address())
    }
}

/// Public listener ids mapped to the store's native ids
#[derive(Default)]
pub(crate) struct TokenTable {
    tokens: Mutex<HashMap<ListenerId, u64>>,
}

impl TokenTable {
    pub fn insert(&self, native: u64) -> ListenerId {
        let id = ListenerId::new();
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, native);
        id
    }

    pub fn take(&self, id: &ListenerId) -> Option<u64> {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }
}

/// Decode a stored value, logging values that no longer decode
pub(crate) fn decode_or_log<T, C: Codec<T>>(
    codec: &C,
    name: &str,
    stored: &C::Stored,
) -> Option<T> {
    match codec.decode(name, stored) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(name, error = %e, "dropping undecodable value");
            None
        }
    }
}

/// Builds typed handles over a registry for one member
#[derive(Clone)]
pub struct StoreFactory<C> {
    registry: Arc<Registry>,
    node: Arc<dyn Node>,
    codec: C,
    lock_config: LockConfig,
}

impl<C> StoreFactory<C> {
    pub fn new(
        registry: Arc<Registry>,
        node: Arc<dyn Node>,
        codec: C,
        lock_config: LockConfig,
    ) -> Self {
        Self {
            registry,
            node,
            codec,
            lock_config,
        }
    }

    pub fn node(&self) -> &Arc<dyn Node> {
        &self.node
    }

    pub fn queue<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedQueue<T>>>
    where
        C: Codec<T>,
    {
        let tag = std::any::type_name::<T>();
        let store = self.registry.get_or_create(StoreKind::Queue, name, tag, || {
            MemoryQueue::<C::Stored>::fifo(name)
        })?;
        Ok(Arc::new(StoreQueue::new(store, self.codec.clone(), Arc::clone(&self.node))))
    }

    pub fn priority_queue<T: Payload + Ord>(
        &self,
        name: &str,
    ) -> DataResult<Arc<dyn DistributedQueue<T>>>
    where
        C: Codec<T>,
    {
        let tag = format!("priority<{}>", std::any::type_name::<T>());
        let order = priority_order::<T, C>(self.codec.clone(), name);
        let store = self.registry.get_or_create(StoreKind::Queue, name, &tag, || {
            MemoryQueue::<C::Stored>::ordered(name, order)
        })?;
        Ok(Arc::new(StoreQueue::new(store, self.codec.clone(), Arc::clone(&self.node))))
    }

    pub fn map<K: Key, V: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedMap<K, V>>>
    where
        C: Codec<K> + Codec<V>,
        <C as Codec<K>>::Stored: Eq + Hash,
    {
        let tag = format!("{}->{}", std::any::type_name::<K>(), std::any::type_name::<V>());
        let lock_config = self.lock_config.clone();
        let store = self.registry.get_or_create(StoreKind::Map, name, &tag, || {
            MemoryMap::<<C as Codec<K>>::Stored, <C as Codec<V>>::Stored>::new(name, lock_config)
        })?;
        Ok(Arc::new(StoreMap::new(store, self.codec.clone(), Arc::clone(&self.node))))
    }

    pub fn set<E: Key>(&self, name: &str) -> DataResult<Arc<dyn DistributedSet<E>>>
    where
        C: Codec<E>,
        C::Stored: Eq + Hash,
    {
        let tag = std::any::type_name::<E>();
        let store = self.registry.get_or_create(StoreKind::Set, name, tag, || {
            MemorySet::<C::Stored>::new(name)
        })?;
        Ok(Arc::new(StoreSet::new(store, self.codec.clone(), Arc::clone(&self.node))))
    }

    pub fn topic<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedTopic<T>>>
    where
        C: Codec<T>,
    {
        let tag = std::any::type_name::<T>();
        let store = self.registry.get_or_create(StoreKind::Topic, name, tag, || {
            MemoryTopic::<C::Stored>::new(name)
        })?;
        Ok(Arc::new(StoreTopic::new(store, self.codec.clone(), Arc::clone(&self.node))))
    }
}

/// Order stored values by decoding them; undecodable values sort as equal
fn priority_order<T: Payload + Ord, C: Codec<T>>(codec: C, name: &str) -> Order<C::Stored> {
    let name = name.to_string();
    Arc::new(move |a, b| match (codec.decode(&name, a), codec.decode(&name, b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => std::cmp::Ordering::Equal,
    })
}

pub(crate) type Stored<C, T> = <C as Codec<T>>::Stored;

/// Forwards item events after decoding them
pub(crate) struct DecodedItems<T, C> {
    pub codec: C,
    pub inner: Arc<dyn ItemListener<T>>,
}

impl<T: Payload, C: Codec<T>> ItemListener<C::Stored> for DecodedItems<T, C> {
    fn item_added(&self, event: ItemEvent<C::Stored>) {
        if let Some(item) = decode_or_log(&self.codec, &event.source, &event.item) {
            self.inner.item_added(ItemEvent {
                source: event.source,
                item,
            });
        }
    }

    fn item_removed(&self, event: ItemEvent<C::Stored>) {
        if let Some(item) = decode_or_log(&self.codec, &event.source, &event.item) {
            self.inner.item_removed(ItemEvent {
                source: event.source,
                item,
            });
        }
    }
}

/// Forwards topic messages after decoding them
pub(crate) struct DecodedMessages<T, C> {
    pub codec: C,
    pub inner: Arc<dyn MessageListener<T>>,
}

impl<T: Payload, C: Codec<T>> MessageListener<C::Stored> for DecodedMessages<T, C> {
    fn on_message(&self, message: Message<C::Stored>) {
        if let Some(payload) = decode_or_log(&self.codec, &message.topic, &message.payload) {
            self.inner.on_message(Message {
                topic: message.topic,
                payload,
                publisher: message.publisher,
            });
        }
    }
}
