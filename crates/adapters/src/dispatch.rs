// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener registration and asynchronous delivery
//!
//! Each primitive owns one dispatcher thread. Jobs are queued while the
//! primitive's state lock is held, so delivery order equals mutation order.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send>;

/// Runs listener callbacks on a dedicated thread
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl Dispatcher {
    /// Start the delivery thread; it exits once the dispatcher is dropped
    pub fn spawn(name: &str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let source = name.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("bq-listeners-{name}"))
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!(source, "listener panicked");
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::error!(name, error = %e, "failed to start listener thread");
        }
        Self { tx }
    }

    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        // Closed only when the thread failed to start
        let _ = self.tx.send(Box::new(job));
    }
}

/// Ids are unique across registries so one token never names two listeners
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

struct Registration<L: ?Sized> {
    id: u64,
    owner: String,
    listener: Arc<L>,
}

/// Registered listeners keyed by a native id
///
/// Each registration records the member that owns it so a departing member's
/// listeners can be dropped together.
pub struct Listeners<L: ?Sized> {
    entries: RwLock<Vec<Registration<L>>>,
}

impl<L: ?Sized> Listeners<L> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, owner: &str, listener: Arc<L>) -> u64 {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(Registration {
            id,
            owner: owner.to_string(),
            listener,
        });
        id
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|r| r.id != id);
        entries.len() != before
    }

    /// Drop every listener registered by `owner`
    pub fn remove_owner(&self, owner: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|r| r.owner != owner);
        before - entries.len()
    }

    pub fn snapshot(&self) -> Vec<Arc<L>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|r| Arc::clone(&r.listener)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
