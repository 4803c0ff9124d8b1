// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process storage shared by the local and grid backends
//!
//! Stores speak in native `u64` listener ids and explicit owner members.
//! The typed adapters in [`crate::store`] translate to the public contracts.

mod locks;
mod map;
mod queue;
mod set;
mod topic;

pub use locks::KeyLocks;
pub use map::MemoryMap;
pub use queue::{MemoryQueue, Order};
pub use set::MemorySet;
pub use topic::MemoryTopic;

use bq_core::{DataError, DataResult};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// State that is scoped to cluster members
pub trait MemberScoped: Send + Sync {
    /// Drop listeners and locks owned by a member that left
    fn release_member(&self, member: &str);

    /// Forget all data without notifying listeners
    fn discard(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Queue,
    Map,
    Set,
    Topic,
}

struct Entry {
    type_tag: String,
    handle: Arc<dyn Any + Send + Sync>,
    scoped: Arc<dyn MemberScoped>,
}

/// Named stores, created on first use
///
/// Each name remembers the element type it was created with; asking for the
/// same name with another type is a configuration error.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<(StoreKind, String), Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create<S, F>(
        &self,
        kind: StoreKind,
        name: &str,
        type_tag: &str,
        create: F,
    ) -> DataResult<Arc<S>>
    where
        S: MemberScoped + 'static,
        F: FnOnce() -> S,
    {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = (kind, name.to_string());
        if let Some(entry) = entries.get(&key) {
            if entry.type_tag != type_tag {
                return Err(DataError::TypeMismatch {
                    name: name.to_string(),
                });
            }
            return Arc::clone(&entry.handle)
                .downcast::<S>()
                .map_err(|_| DataError::TypeMismatch {
                    name: name.to_string(),
                });
        }

        let store = Arc::new(create());
        entries.insert(
            key,
            Entry {
                type_tag: type_tag.to_string(),
                handle: Arc::clone(&store) as Arc<dyn Any + Send + Sync>,
                scoped: Arc::clone(&store) as Arc<dyn MemberScoped>,
            },
        );
        tracing::debug!(?kind, name, type_tag, "created store");
        Ok(store)
    }

    pub fn release_member(&self, member: &str) {
        for entry in self.scoped() {
            entry.release_member(member);
        }
    }

    pub fn discard_all(&self) {
        for entry in self.scoped() {
            entry.discard();
        }
    }

    fn scoped(&self) -> Vec<Arc<dyn MemberScoped>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().map(|e| Arc::clone(&e.scoped)).collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
