// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{decode_or_log, Codec, Node, Stored, TokenTable};
use crate::memory::MemoryMap;
use bq_core::{
    ChangeListener, DataResult, DistributedMap, EntryEvent, EntryListener, Key, ListenerId,
    Payload,
};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct StoreMap<K, V, C>
where
    C: Codec<K> + Codec<V>,
{
    store: Arc<MemoryMap<Stored<C, K>, Stored<C, V>>>,
    codec: C,
    node: Arc<dyn Node>,
    tokens: TokenTable,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> StoreMap<K, V, C>
where
    K: Key,
    V: Payload,
    C: Codec<K> + Codec<V>,
    Stored<C, K>: Eq + Hash,
{
    pub fn new(
        store: Arc<MemoryMap<Stored<C, K>, Stored<C, V>>>,
        codec: C,
        node: Arc<dyn Node>,
    ) -> Self {
        Self {
            store,
            codec,
            node,
            tokens: TokenTable::default(),
            _entry: PhantomData,
        }
    }

    fn key(&self, key: &K) -> DataResult<Stored<C, K>> {
        <C as Codec<K>>::encode(&self.codec, self.store.name(), key)
    }

    fn value(&self, stored: &Stored<C, V>) -> DataResult<V> {
        <C as Codec<V>>::decode(&self.codec, self.store.name(), stored)
    }

    fn entries(&self) -> DataResult<Vec<(K, V)>> {
        self.node.ensure_active()?;
        let name = self.store.name();
        self.store.read(|entries| {
            entries
                .iter()
                .map(|(k, v)| {
                    let key = <C as Codec<K>>::decode(&self.codec, name, k)?;
                    let value = <C as Codec<V>>::decode(&self.codec, name, v)?;
                    Ok((key, value))
                })
                .collect()
        })
    }
}

impl<K, V, C> DistributedMap<K, V> for StoreMap<K, V, C>
where
    K: Key,
    V: Payload,
    C: Codec<K> + Codec<V>,
    Stored<C, K>: Eq + Hash,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn get(&self, key: &K) -> DataResult<Option<V>> {
        self.node.ensure_active()?;
        let key = self.key(key)?;
        self.store.get(&key).map(|v| self.value(&v)).transpose()
    }

    fn get_all(&self, keys: &HashSet<K>) -> DataResult<HashMap<K, V>> {
        self.node.ensure_active()?;
        let encoded = keys
            .iter()
            .map(|k| Ok((k.clone(), self.key(k)?)))
            .collect::<DataResult<Vec<_>>>()?;
        let found: Vec<(K, Stored<C, V>)> = self.store.read(|entries| {
            encoded
                .into_iter()
                .filter_map(|(k, stored)| entries.get(&stored).map(|v| (k, v.clone())))
                .collect()
        });
        found
            .into_iter()
            .map(|(k, v)| Ok((k, self.value(&v)?)))
            .collect()
    }

    fn put(&self, key: K, value: V) -> DataResult<Option<V>> {
        self.node.ensure_active()?;
        let stored_key = self.key(&key)?;
        let stored_value = <C as Codec<V>>::encode(&self.codec, self.name(), &value)?;
        self.store
            .put(stored_key, stored_value)
            .map(|old| self.value(&old))
            .transpose()
    }

    fn remove(&self, key: &K) -> DataResult<Option<V>> {
        self.node.ensure_active()?;
        let key = self.key(key)?;
        self.store.remove(&key).map(|old| self.value(&old)).transpose()
    }

    fn contains_key(&self, key: &K) -> DataResult<bool> {
        self.node.ensure_active()?;
        let key = self.key(key)?;
        Ok(self.store.read(|entries| entries.contains_key(&key)))
    }

    fn values(&self) -> DataResult<Vec<V>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    fn key_set(&self) -> DataResult<HashSet<K>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    fn entry_set(&self) -> DataResult<Vec<(K, V)>> {
        self.entries()
    }

    fn map_copy(&self) -> DataResult<HashMap<K, V>> {
        Ok(self.entries()?.into_iter().collect())
    }

    fn size(&self) -> DataResult<usize> {
        self.node.ensure_active()?;
        Ok(self.store.read(|entries| entries.len()))
    }

    fn clear(&self) -> DataResult<()> {
        self.node.ensure_active()?;
        self.store.clear();
        Ok(())
    }

    fn lock(&self, key: &K) -> DataResult<()> {
        self.node.ensure_active()?;
        let key = self.key(key)?;
        self.store.lock(&key, &self.node.holder());
        Ok(())
    }

    fn unlock(&self, key: &K) -> DataResult<()> {
        let key = self.key(key)?;
        self.store.unlock(&key, &self.node.holder())
    }

    fn add_entry_listener(
        &self,
        listener: Arc<dyn EntryListener<K, V>>,
    ) -> DataResult<ListenerId> {
        self.node.ensure_active()?;
        let decoded = Arc::new(DecodedEntries {
            codec: self.codec.clone(),
            inner: listener,
        });
        let native = self.store.add_entry_listener(self.node.address(), decoded);
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
                    tracing::debug!(map = self.name(), %id, "listener already released");
                }
            }
            None => tracing::warn!(map = self.name(), %id, "unknown listener id"),
        }
    }
}

struct DecodedEntries<K, V, C> {
    codec: C,
    inner: Arc<dyn EntryListener<K, V>>,
}

impl<K, V, C> DecodedEntries<K, V, C>
where
    K: Payload,
    V: Payload,
    C: Codec<K> + Codec<V>,
{
    fn decode(&self, event: EntryEvent<Stored<C, K>, Stored<C, V>>) -> Option<EntryEvent<K, V>> {
        let source = event.source;
        let key = decode_or_log::<K, C>(&self.codec, &source, &event.key)?;
        let value = match &event.value {
            Some(v) => Some(decode_or_log::<V, C>(&self.codec, &source, v)?),
            None => None,
        };
        let old_value = match &event.old_value {
            Some(v) => Some(decode_or_log::<V, C>(&self.codec, &source, v)?),
            None => None,
        };
        Some(EntryEvent {
            source,
            key,
            value,
            old_value,
        })
    }
}

impl<K, V, C> EntryListener<Stored<C, K>, Stored<C, V>> for DecodedEntries<K, V, C>
where
    K: Payload,
    V: Payload,
    C: Codec<K> + Codec<V>,
{
    fn entry_added(&self, event: EntryEvent<Stored<C, K>, Stored<C, V>>) {
        if let Some(event) = self.decode(event) {
            self.inner.entry_added(event);
        }
    }

    fn entry_updated(&self, event: EntryEvent<Stored<C, K>, Stored<C, V>>) {
        if let Some(event) = self.decode(event) {
            self.inner.entry_updated(event);
        }
    }

    fn entry_removed(&self, event: EntryEvent<Stored<C, K>, Stored<C, V>>) {
        if let Some(event) = self.decode(event) {
            self.inner.entry_removed(event);
        }
    }
}
