// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::DataResult;
use crate::listener::{ChangeListener, EntryListener, ListenerId};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

/// A cluster-wide key/value map with per-key locks
pub trait DistributedMap<K, V>: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &K) -> DataResult<Option<V>>;

    /// Entries for the requested keys that exist
    fn get_all(&self, keys: &HashSet<K>) -> DataResult<HashMap<K, V>>;

    /// Returns the previous value
    fn put(&self, key: K, value: V) -> DataResult<Option<V>>;

    /// Returns the removed value
    fn remove(&self, key: &K) -> DataResult<Option<V>>;

    fn contains_key(&self, key: &K) -> DataResult<bool>;

    fn values(&self) -> DataResult<Vec<V>>;

    fn key_set(&self) -> DataResult<HashSet<K>>;

    fn entry_set(&self) -> DataResult<Vec<(K, V)>>;

    /// Local snapshot that no longer tracks the cluster
    fn map_copy(&self) -> DataResult<HashMap<K, V>>;

    fn size(&self) -> DataResult<usize>;

    fn clear(&self) -> DataResult<()>;

    /// Block until the calling thread holds the lock on `key`
    ///
    /// Re-entrant for the same thread. The lock lapses once its lease expires.
    fn lock(&self, key: &K) -> DataResult<()>;

    /// Release one level of the calling thread's lock on `key`
    fn unlock(&self, key: &K) -> DataResult<()>;

    fn add_entry_listener(
        &self,
        listener: Arc<dyn EntryListener<K, V>>,
    ) -> DataResult<ListenerId>;

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId>;

    /// Unknown ids and unreachable backends are logged and ignored
    fn remove_listener(&self, id: &ListenerId);
}

/// Holds a map key lock until dropped
///
/// Released on every exit path, including early returns and unwinding.
pub struct KeyGuard<'a, K: Debug, V> {
    map: &'a dyn DistributedMap<K, V>,
    key: K,
}

impl<'a, K: Debug, V> KeyGuard<'a, K, V> {
    pub fn acquire(map: &'a dyn DistributedMap<K, V>, key: K) -> DataResult<Self> {
        map.lock(&key)?;
        Ok(Self { map, key })
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Debug, V> Drop for KeyGuard<'_, K, V> {
    fn drop(&mut self) {
        if let Err(e) = self.map.unlock(&self.key) {
            tracing::error!(
                map = self.map.name(),
                key = ?self.key,
                error = %e,
                "failed to release key lock"
            );
        }
    }
}
