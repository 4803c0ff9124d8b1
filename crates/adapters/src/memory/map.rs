// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::locks::KeyLocks;
use super::MemberScoped;
use crate::dispatch::{Dispatcher, Listeners};
use bq_core::{ChangeEvent, ChangeListener, EntryChange, EntryListener, HolderId, LockConfig};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// In-process map storage with per-key lease locks
pub struct MemoryMap<K, V> {
    name: String,
    entries: Mutex<HashMap<K, V>>,
    locks: KeyLocks<K>,
    entry_listeners: Listeners<dyn EntryListener<K, V>>,
    change_listeners: Listeners<dyn ChangeListener>,
    dispatcher: Dispatcher,
}

impl<K, V> MemoryMap<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &str, lock_config: LockConfig) -> Self {
        Self {
            name: name.to_string(),
            entries: Mutex::new(HashMap::new()),
            locks: KeyLocks::new(name, lock_config),
            entry_listeners: Listeners::new(),
            change_listeners: Listeners::new(),
            dispatcher: Dispatcher::spawn(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.read(|entries| entries.get(key).cloned())
    }

    pub fn put(&self, key: K, value: V) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let old = entries.insert(key.clone(), value.clone());
        self.emit(EntryChange::put(key, value, old.clone()));
        old
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let old = entries.remove(key)?;
        self.emit(EntryChange::Removed {
            key: key.clone(),
            old_value: old.clone(),
        });
        Some(old)
    }

    /// Remove everything, one removed event per entry
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, old_value) in entries.drain() {
            self.emit(EntryChange::Removed { key, old_value });
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        f(&entries)
    }

    pub fn lock(&self, key: &K, holder: &HolderId) {
        self.locks.lock(key, holder);
    }

    pub fn unlock(&self, key: &K, holder: &HolderId) -> bq_core::DataResult<()> {
        self.locks.unlock(key, holder)
    }

    pub fn add_entry_listener(&self, owner: &str, listener: Arc<dyn EntryListener<K, V>>) -> u64 {
        self.entry_listeners.add(owner, listener)
    }

    pub fn add_change_listener(&self, owner: &str, listener: Arc<dyn ChangeListener>) -> u64 {
        self.change_listeners.add(owner, listener)
    }

    pub fn remove_listener(&self, id: u64) -> bool {
        self.entry_listeners.remove(id) || self.change_listeners.remove(id)
    }

    fn emit(&self, change: EntryChange<K, V>) {
        let entry_listeners = self.entry_listeners.snapshot();
        let change_listeners = self.change_listeners.snapshot();
        if entry_listeners.is_empty() && change_listeners.is_empty() {
            return;
        }
        let source = self.name.clone();
        self.dispatcher.dispatch(move || {
            for listener in &entry_listeners {
                change.deliver(&source, listener.as_ref());
            }
            for listener in &change_listeners {
                listener.changed(ChangeEvent {
                    source: source.clone(),
                    kind: change.kind(),
                });
            }
        });
    }
}

impl<K, V> MemberScoped for MemoryMap<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn release_member(&self, member: &str) {
        self.entry_listeners.remove_owner(member);
        self.change_listeners.remove_owner(member);
        let released = self.locks.release_member(member);
        if released > 0 {
            tracing::info!(map = %self.name, member, released, "released locks of departed member");
        }
    }

    fn discard(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
#[path = "map_tests.rs"]
mod tests;
