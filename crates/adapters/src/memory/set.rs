// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MemberScoped;
use crate::dispatch::{Dispatcher, Listeners};
use bq_core::{ItemChange, ItemListener};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

pub struct MemorySet<E> {
    name: String,
    elements: Mutex<HashSet<E>>,
    listeners: Listeners<dyn ItemListener<E>>,
    dispatcher: Dispatcher,
}

impl<E: Clone + Eq + Hash + Send + Sync + 'static> MemorySet<E> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elements: Mutex::new(HashSet::new()),
            listeners: Listeners::new(),
            dispatcher: Dispatcher::spawn(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert each element; returns true if any was new
    pub fn add_all(&self, new: Vec<E>) -> bool {
        let mut elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        let changes: Vec<_> = new
            .into_iter()
            .filter(|e| elements.insert(e.clone()))
            .map(ItemChange::Added)
            .collect();
        let changed = !changes.is_empty();
        self.emit(changes);
        changed
    }

    /// Remove each element; returns true if any was present
    pub fn remove_all(&self, targets: &[E]) -> bool {
        let mut elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        let changes: Vec<_> = targets
            .iter()
            .filter(|e| elements.remove(*e))
            .cloned()
            .map(ItemChange::Removed)
            .collect();
        let changed = !changes.is_empty();
        self.emit(changes);
        changed
    }

    pub fn clear(&self) {
        let mut elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        let changes = elements.drain().map(ItemChange::Removed).collect();
        self.emit(changes);
    }

    pub fn read<R>(&self, f: impl FnOnce(&HashSet<E>) -> R) -> R {
        let elements = self.elements.lock().unwrap_or_else(|e| e.into_inner());
        f(&elements)
    }

    pub fn add_item_listener(&self, owner: &str, listener: Arc<dyn ItemListener<E>>) -> u64 {
        self.listeners.add(owner, listener)
    }

    pub fn remove_listener(&self, id: u64) -> bool {
        self.listeners.remove(id)
    }

    fn emit(&self, changes: Vec<ItemChange<E>>) {
        let listeners = self.listeners.snapshot();
        if changes.is_empty() || listeners.is_empty() {
            return;
        }
        let source = self.name.clone();
        self.dispatcher.dispatch(move || {
            for change in &changes {
                for listener in &listeners {
                    change.deliver(&source, listener.as_ref());
                }
            }
        });
    }
}

impl<E: Clone + Eq + Hash + Send + Sync + 'static> MemberScoped for MemorySet<E> {
    fn release_member(&self, member: &str) {
        self.listeners.remove_owner(member);
    }

    fn discard(&self) {
        self.elements.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
