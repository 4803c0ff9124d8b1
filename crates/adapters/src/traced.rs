// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced primitive wrappers for consistent observability

use bq_core::{
    ChangeListener, DataResult, DistributedMap, DistributedQueue, EntryListener, ItemListener,
    ListenerId,
};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Wrapper that adds tracing to any queue handle
pub struct TracedQueue<T> {
    inner: Arc<dyn DistributedQueue<T>>,
}

impl<T> TracedQueue<T> {
    pub fn new(inner: Arc<dyn DistributedQueue<T>>) -> Self {
        Self { inner }
    }
}

/// Wrap a queue handle, keeping it behind the same trait object
pub fn queue<T: Debug + 'static>(
    inner: Arc<dyn DistributedQueue<T>>,
) -> Arc<dyn DistributedQueue<T>> {
    Arc::new(TracedQueue::new(inner))
}

impl<T: Debug> DistributedQueue<T> for TracedQueue<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn add(&self, item: T) -> DataResult<bool> {
        let span = tracing::debug_span!("queue.add", queue = self.inner.name());
        let _guard = span.enter();

        tracing::debug!(?item, "adding");
        let result = self.inner.add(item);
        if let Err(e) = &result {
            tracing::error!(error = %e, "add failed");
        }
        result
    }

    fn add_all(&self, items: Vec<T>) -> DataResult<bool> {
        let span = tracing::debug_span!(
            "queue.add_all",
            queue = self.inner.name(),
            count = items.len()
        );
        let _guard = span.enter();

        let result = self.inner.add_all(items);
        if let Err(e) = &result {
            tracing::error!(error = %e, "add_all failed");
        }
        result
    }

    fn poll(&self) -> DataResult<Option<T>> {
        let span = tracing::debug_span!("queue.poll", queue = self.inner.name());
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.poll();
        match &result {
            Ok(Some(item)) => tracing::debug!(?item, elapsed_ms = elapsed_ms(start), "polled"),
            Ok(None) => tracing::trace!("empty"),
            Err(e) => tracing::error!(error = %e, "poll failed"),
        }
        result
    }

    fn peek(&self) -> DataResult<Option<T>> {
        self.inner.peek()
    }

    fn remove_all(&self, items: &[T]) -> DataResult<bool> {
        let span = tracing::debug_span!(
            "queue.remove_all",
            queue = self.inner.name(),
            count = items.len()
        );
        let _guard = span.enter();

        let result = self.inner.remove_all(items);
        match &result {
            Ok(removed) => tracing::debug!(removed, "removed"),
            Err(e) => tracing::error!(error = %e, "remove_all failed"),
        }
        result
    }

    fn get_all(&self) -> DataResult<Vec<T>> {
        self.inner.get_all()
    }

    fn clear(&self) -> DataResult<()> {
        let result = self.inner.clear();
        tracing::info!(queue = self.inner.name(), ok = result.is_ok(), "cleared");
        result
    }

    fn size(&self) -> DataResult<usize> {
        self.inner.size()
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<T>>) -> DataResult<ListenerId> {
        let result = self.inner.add_item_listener(listener);
        tracing::debug!(
            queue = self.inner.name(),
            id = ?result.as_ref().ok(),
            "item listener added"
        );
        result
    }

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId> {
        self.inner.add_listener(listener)
    }

    fn remove_listener(&self, id: &ListenerId) {
        tracing::debug!(queue = self.inner.name(), %id, "removing listener");
        self.inner.remove_listener(id)
    }
}

/// Wrapper that adds tracing to any map handle
pub struct TracedMap<K, V> {
    inner: Arc<dyn DistributedMap<K, V>>,
}

impl<K, V> TracedMap<K, V> {
    pub fn new(inner: Arc<dyn DistributedMap<K, V>>) -> Self {
        Self { inner }
    }
}

/// Wrap a map handle, keeping it behind the same trait object
pub fn map<K: Debug + 'static, V: 'static>(
    inner: Arc<dyn DistributedMap<K, V>>,
) -> Arc<dyn DistributedMap<K, V>> {
    Arc::new(TracedMap::new(inner))
}

impl<K: Debug, V> DistributedMap<K, V> for TracedMap<K, V> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &K) -> DataResult<Option<V>> {
        let result = self.inner.get(key);
        tracing::trace!(
            map = self.inner.name(),
            ?key,
            found = ?result.as_ref().map(|v| v.is_some()).ok(),
            "get"
        );
        result
    }

    fn get_all(&self, keys: &HashSet<K>) -> DataResult<HashMap<K, V>> {
        self.inner.get_all(keys)
    }

    fn put(&self, key: K, value: V) -> DataResult<Option<V>> {
        let span = tracing::debug_span!("map.put", map = self.inner.name(), key = ?key);
        let _guard = span.enter();

        let result = self.inner.put(key, value);
        match &result {
            Ok(old) => tracing::debug!(replaced = old.is_some(), "stored"),
            Err(e) => tracing::error!(error = %e, "put failed"),
        }
        result
    }

    fn remove(&self, key: &K) -> DataResult<Option<V>> {
        let span = tracing::debug_span!("map.remove", map = self.inner.name(), ?key);
        let _guard = span.enter();

        let result = self.inner.remove(key);
        match &result {
            Ok(old) => tracing::debug!(existed = old.is_some(), "removed"),
            Err(e) => tracing::error!(error = %e, "remove failed"),
        }
        result
    }

    fn contains_key(&self, key: &K) -> DataResult<bool> {
        self.inner.contains_key(key)
    }

    fn values(&self) -> DataResult<Vec<V>> {
        self.inner.values()
    }

    fn key_set(&self) -> DataResult<HashSet<K>> {
        self.inner.key_set()
    }

    fn entry_set(&self) -> DataResult<Vec<(K, V)>> {
        self.inner.entry_set()
    }

    fn map_copy(&self) -> DataResult<HashMap<K, V>> {
        self.inner.map_copy()
    }

    fn size(&self) -> DataResult<usize> {
        self.inner.size()
    }

    fn clear(&self) -> DataResult<()> {
        let result = self.inner.clear();
        tracing::info!(map = self.inner.name(), ok = result.is_ok(), "cleared");
        result
    }

    fn lock(&self, key: &K) -> DataResult<()> {
        let span = tracing::debug_span!("map.lock", map = self.inner.name(), ?key);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.lock(key);
        let waited = elapsed_ms(start);
        match &result {
            Ok(()) if waited > 1000 => {
                tracing::warn!(elapsed_ms = waited, "lock acquired after long wait")
            }
            Ok(()) => tracing::debug!(elapsed_ms = waited, "lock acquired"),
            Err(e) => tracing::error!(elapsed_ms = waited, error = %e, "lock failed"),
        }
        result
    }

    fn unlock(&self, key: &K) -> DataResult<()> {
        let result = self.inner.unlock(key);
        match &result {
            Ok(()) => tracing::debug!(map = self.inner.name(), ?key, "lock released"),
            Err(e) => tracing::error!(map = self.inner.name(), ?key, error = %e, "unlock failed"),
        }
        result
    }

    fn add_entry_listener(
        &self,
        listener: Arc<dyn EntryListener<K, V>>,
    ) -> DataResult<ListenerId> {
        let result = self.inner.add_entry_listener(listener);
        tracing::debug!(
            map = self.inner.name(),
            id = ?result.as_ref().ok(),
            "entry listener added"
        );
        result
    }

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId> {
        self.inner.add_listener(listener)
    }

    fn remove_listener(&self, id: &ListenerId) {
        tracing::debug!(map = self.inner.name(), %id, "removing listener");
        self.inner.remove_listener(id)
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
