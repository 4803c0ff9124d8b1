// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MemberScoped;
use crate::dispatch::{Dispatcher, Listeners};
use bq_core::{ChangeEvent, ChangeListener, ItemChange, ItemListener};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Comparator for priority queues
pub type Order<S> = Arc<dyn Fn(&S, &S) -> Ordering + Send + Sync>;

/// In-process queue storage with native listener ids
pub struct MemoryQueue<S> {
    name: String,
    items: Mutex<VecDeque<S>>,
    order: Option<Order<S>>,
    item_listeners: Listeners<dyn ItemListener<S>>,
    change_listeners: Listeners<dyn ChangeListener>,
    dispatcher: Dispatcher,
}

impl<S: Clone + PartialEq + Send + Sync + 'static> MemoryQueue<S> {
    pub fn fifo(name: &str) -> Self {
        Self::build(name, None)
    }

    /// Keeps elements sorted by `order`; equal elements stay in insertion order
    pub fn ordered(name: &str, order: Order<S>) -> Self {
        Self::build(name, Some(order))
    }

    fn build(name: &str, order: Option<Order<S>>) -> Self {
        Self {
            name: name.to_string(),
            items: Mutex::new(VecDeque::new()),
            order,
            item_listeners: Listeners::new(),
            change_listeners: Listeners::new(),
            dispatcher: Dispatcher::spawn(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, item: S) {
        self.add_all(vec![item]);
    }

    pub fn add_all(&self, new_items: Vec<S>) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let mut changes = Vec::with_capacity(new_items.len());
        for item in new_items {
            self.insert(&mut items, item.clone());
            changes.push(ItemChange::Added(item));
        }
        self.emit(changes);
    }

    pub fn poll(&self) -> Option<S> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let head = items.pop_front()?;
        self.emit(vec![ItemChange::Removed(head.clone())]);
        Some(head)
    }

    pub fn peek(&self) -> Option<S> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.front().cloned()
    }

    /// Remove every element equal to one of `targets`
    pub fn remove_all(&self, targets: &[S]) -> bool {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let mut changes = Vec::new();
        items.retain(|item| {
            if targets.contains(item) {
                changes.push(ItemChange::Removed(item.clone()));
                false
            } else {
                true
            }
        });
        let removed = !changes.is_empty();
        self.emit(changes);
        removed
    }

    pub fn snapshot(&self) -> Vec<S> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let changes = items.drain(..).map(ItemChange::Removed).collect();
        self.emit(changes);
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_item_listener(&self, owner: &str, listener: Arc<dyn ItemListener<S>>) -> u64 {
        self.item_listeners.add(owner, listener)
    }

    pub fn add_change_listener(&self, owner: &str, listener: Arc<dyn ChangeListener>) -> u64 {
        self.change_listeners.add(owner, listener)
    }

    pub fn remove_listener(&self, id: u64) -> bool {
        self.item_listeners.remove(id) || self.change_listeners.remove(id)
    }

    fn insert(&self, items: &mut VecDeque<S>, item: S) {
        match &self.order {
            None => items.push_back(item),
            Some(order) => {
                let pos = items
                    .iter()
                    .position(|existing| order(existing, &item) == Ordering::Greater)
                    .unwrap_or(items.len());
                items.insert(pos, item);
            }
        }
    }

    fn emit(&self, changes: Vec<ItemChange<S>>) {
        if changes.is_empty() {
            return;
        }
        let item_listeners = self.item_listeners.snapshot();
        let change_listeners = self.change_listeners.snapshot();
        if item_listeners.is_empty() && change_listeners.is_empty() {
            return;
        }
        let source = self.name.clone();
        self.dispatcher.dispatch(move || {
            for change in &changes {
                for listener in &item_listeners {
                    change.deliver(&source, listener.as_ref());
                }
                for listener in &change_listeners {
                    listener.changed(ChangeEvent {
                        source: source.clone(),
                        kind: change.kind(),
                    });
                }
            }
        });
    }
}

impl<S: Clone + PartialEq + Send + Sync + 'static> MemberScoped for MemoryQueue<S> {
    fn release_member(&self, member: &str) {
        self.item_listeners.remove_owner(member);
        self.change_listeners.remove_owner(member);
    }

    fn discard(&self) {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
