// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key lease locks for in-process maps

use bq_core::{
    Clock, DataError, DataResult, HolderId, LeaseInput, LeaseLock, LeaseOutcome, LockConfig,
    SystemClock,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

pub struct KeyLocks<K, C: Clock = SystemClock> {
    name: String,
    config: LockConfig,
    clock: C,
    locks: Mutex<HashMap<K, LeaseLock>>,
    released: Condvar,
}

impl<K: Clone + Eq + Hash + Debug> KeyLocks<K> {
    pub fn new(name: impl Into<String>, config: LockConfig) -> Self {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<K: Clone + Eq + Hash + Debug, C: Clock> KeyLocks<K, C> {
    pub fn with_clock(name: impl Into<String>, config: LockConfig, clock: C) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            locks: Mutex::new(HashMap::new()),
            released: Condvar::new(),
        }
    }

    /// Block until `holder` owns the lock on `key`
    pub fn lock(&self, key: &K, holder: &HolderId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let current = locks
                .get(key)
                .cloned()
                .unwrap_or_else(|| LeaseLock::new(self.config.lease));
            let (next, outcome) = current.transition(
                LeaseInput::Acquire {
                    holder: holder.clone(),
                },
                &self.clock,
            );
            match outcome {
                LeaseOutcome::Denied { .. } => {
                    locks = match self.released.wait_timeout(locks, self.config.retry_interval) {
                        Ok((guard, _)) => guard,
                        Err(e) => e.into_inner().0,
                    };
                }
                LeaseOutcome::Reclaimed { previous } => {
                    tracing::warn!(
                        map = %self.name,
                        ?key,
                        %previous,
                        %holder,
                        "reclaimed expired key lock"
                    );
                    locks.insert(key.clone(), next);
                    return;
                }
                _ => {
                    locks.insert(key.clone(), next);
                    return;
                }
            }
        }
    }

    /// Release one level of `holder`'s lock on `key`
    pub fn unlock(&self, key: &K, holder: &HolderId) -> DataResult<()> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = locks.get(key).cloned() else {
            return Err(self.not_held(key, holder));
        };
        let (next, outcome) = current.transition(
            LeaseInput::Release {
                holder: holder.clone(),
            },
            &self.clock,
        );
        match outcome {
            LeaseOutcome::Released => {
                locks.remove(key);
                self.released.notify_all();
                Ok(())
            }
            LeaseOutcome::StillHeld { .. } => {
                locks.insert(key.clone(), next);
                Ok(())
            }
            _ => Err(self.not_held(key, holder)),
        }
    }

    pub fn is_locked(&self, key: &K) -> bool {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .get(key)
            .map(|l| !l.is_free() && !l.is_expired(&self.clock))
            .unwrap_or(false)
    }

    /// Drop every lock held by threads of `member`
    pub fn release_member(&self, member: &str) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| {
            lock.holder()
                .map(|h| h.member() != member)
                .unwrap_or(false)
        });
        let released = before - locks.len();
        if released > 0 {
            self.released.notify_all();
        }
        released
    }

    fn not_held(&self, key: &K, holder: &HolderId) -> DataError {
        DataError::LockNotHeld {
            name: self.name.clone(),
            key: format!("{key:?}"),
            holder: holder.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
