// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener contracts for distributed primitives
//!
//! Callbacks run on a dispatcher thread owned by the primitive, never on the
//! thread that performed the mutation. Events for one primitive arrive in the
//! order the mutations were applied.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token returned by listener registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An element added to or removed from a queue or set
#[derive(Clone, Debug, PartialEq)]
pub struct ItemEvent<T> {
    /// Name of the primitive the event came from
    pub source: String,
    pub item: T,
}

/// A map entry change
#[derive(Clone, Debug, PartialEq)]
pub struct EntryEvent<K, V> {
    pub source: String,
    pub key: K,
    pub value: Option<V>,
    pub old_value: Option<V>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
}

/// Change-only signal without the payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub source: String,
    pub kind: ChangeKind,
}

/// A message published on a topic
#[derive(Clone, Debug, PartialEq)]
pub struct Message<T> {
    pub topic: String,
    pub payload: T,
    /// Member address of the publisher, when the backend knows it
    pub publisher: Option<String>,
}

pub trait ItemListener<T>: Send + Sync {
    fn item_added(&self, _event: ItemEvent<T>) {}
    fn item_removed(&self, _event: ItemEvent<T>) {}
}

pub trait EntryListener<K, V>: Send + Sync {
    fn entry_added(&self, _event: EntryEvent<K, V>) {}
    fn entry_updated(&self, _event: EntryEvent<K, V>) {}
    fn entry_removed(&self, _event: EntryEvent<K, V>) {}
}

pub trait ChangeListener: Send + Sync {
    fn changed(&self, event: ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(ChangeEvent) + Send + Sync,
{
    fn changed(&self, event: ChangeEvent) {
        self(event)
    }
}

pub trait MessageListener<T>: Send + Sync {
    fn on_message(&self, message: Message<T>);
}

impl<T, F> MessageListener<T> for F
where
    F: Fn(Message<T>) + Send + Sync,
{
    fn on_message(&self, message: Message<T>) {
        self(message)
    }
}

/// An item mutation waiting to be delivered
#[derive(Clone, Debug, PartialEq)]
pub enum ItemChange<T> {
    Added(T),
    Removed(T),
}

impl<T: Clone> ItemChange<T> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added(_) => ChangeKind::Added,
            Self::Removed(_) => ChangeKind::Removed,
        }
    }

    pub fn deliver(&self, source: &str, listener: &dyn ItemListener<T>) {
        match self {
            Self::Added(item) => listener.item_added(ItemEvent {
                source: source.to_string(),
                item: item.clone(),
            }),
            Self::Removed(item) => listener.item_removed(ItemEvent {
                source: source.to_string(),
                item: item.clone(),
            }),
        }
    }
}

/// A map mutation waiting to be delivered
#[derive(Clone, Debug, PartialEq)]
pub enum EntryChange<K, V> {
    Added { key: K, value: V },
    Updated { key: K, value: V, old_value: V },
    Removed { key: K, old_value: V },
}

impl<K: Clone, V: Clone> EntryChange<K, V> {
    /// Classify a put by whether it replaced a value
    pub fn put(key: K, value: V, old_value: Option<V>) -> Self {
        match old_value {
            Some(old_value) => Self::Updated {
                key,
                value,
                old_value,
            },
            None => Self::Added { key, value },
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Added,
            Self::Updated { .. } => ChangeKind::Updated,
            Self::Removed { .. } => ChangeKind::Removed,
        }
    }

    pub fn deliver(&self, source: &str, listener: &dyn EntryListener<K, V>) {
        let source = source.to_string();
        match self {
            Self::Added { key, value } => listener.entry_added(EntryEvent {
                source,
                key: key.clone(),
                value: Some(value.clone()),
                old_value: None,
            }),
            Self::Updated {
                key,
                value,
                old_value,
            } => listener.entry_updated(EntryEvent {
                source,
                key: key.clone(),
                value: Some(value.clone()),
                old_value: Some(old_value.clone()),
            }),
            Self::Removed { key, old_value } => listener.entry_removed(EntryEvent {
                source,
                key: key.clone(),
                value: None,
                old_value: Some(old_value.clone()),
            }),
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
