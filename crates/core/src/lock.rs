// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease lock state machine for per-key mutual exclusion
//!
//! A held lock expires once its lease runs out without a release, after which
//! any other holder may reclaim it. Acquisitions by the current holder nest.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Unique identifier for a lock holder
///
/// Holders are a member address plus the acquiring thread, so two threads in
/// the same process contend like two processes do.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Holder id for the calling thread on the given member
    pub fn current_thread(member: &str) -> Self {
        Self(format!("{}/{:?}", member, std::thread::current().id()))
    }

    /// The member part of the id
    pub fn member(&self) -> &str {
        self.0.rsplit_once('/').map(|(m, _)| m).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock state
#[derive(Clone, Debug, Default)]
pub enum LeaseState {
    #[default]
    Free,
    Held {
        holder: HolderId,
        /// Re-entrant acquisition depth
        count: u32,
        expires_at: Instant,
    },
}

/// Events that can trigger lock transitions
#[derive(Clone, Debug)]
pub enum LeaseInput {
    Acquire { holder: HolderId },
    Release { holder: HolderId },
}

/// Result of a single transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseOutcome {
    Acquired,
    /// The holder already had the lock; depth increased
    Reentered { count: u32 },
    /// The previous holder's lease had expired
    Reclaimed { previous: HolderId },
    Denied { current: HolderId },
    Released,
    /// One level of a nested acquisition was released
    StillHeld { count: u32 },
    NotHeld,
}

impl LeaseOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(
            self,
            Self::Acquired | Self::Reentered { .. } | Self::Reclaimed { .. }
        )
    }
}

/// A single key's lease lock
#[derive(Clone, Debug)]
pub struct LeaseLock {
    pub lease: Duration,
    pub state: LeaseState,
}

impl LeaseLock {
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            state: LeaseState::Free,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, LeaseState::Free)
    }

    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        matches!(&self.state, LeaseState::Held { holder: h, .. } if h == holder)
    }

    pub fn holder(&self) -> Option<&HolderId> {
        match &self.state {
            LeaseState::Free => None,
            LeaseState::Held { holder, .. } => Some(holder),
        }
    }

    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        match &self.state {
            LeaseState::Free => false,
            LeaseState::Held { expires_at, .. } => clock.now() >= *expires_at,
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: LeaseInput, clock: &impl Clock) -> (LeaseLock, LeaseOutcome) {
        let mut next = self.clone();
        let expires_at = clock.now() + self.lease;

        let outcome = match input {
            LeaseInput::Acquire { holder } => match &self.state {
                LeaseState::Free => {
                    next.state = LeaseState::Held {
                        holder,
                        count: 1,
                        expires_at,
                    };
                    LeaseOutcome::Acquired
                }
                LeaseState::Held {
                    holder: current,
                    count,
                    ..
                } if current == &holder => {
                    let count = count.saturating_add(1);
                    next.state = LeaseState::Held {
                        holder,
                        count,
                        expires_at,
                    };
                    LeaseOutcome::Reentered { count }
                }
                LeaseState::Held {
                    holder: current, ..
                } => {
                    if self.is_expired(clock) {
                        let previous = current.clone();
                        next.state = LeaseState::Held {
                            holder,
                            count: 1,
                            expires_at,
                        };
                        LeaseOutcome::Reclaimed { previous }
                    } else {
                        LeaseOutcome::Denied {
                            current: current.clone(),
                        }
                    }
                }
            },

            LeaseInput::Release { holder } => match &self.state {
                LeaseState::Held {
                    holder: current,
                    count,
                    expires_at,
                } if current == &holder => {
                    if *count > 1 {
                        next.state = LeaseState::Held {
                            holder,
                            count: count - 1,
                            expires_at: *expires_at,
                        };
                        LeaseOutcome::StillHeld { count: count - 1 }
                    } else {
                        next.state = LeaseState::Free;
                        LeaseOutcome::Released
                    }
                }
                _ => LeaseOutcome::NotHeld,
            },
        };

        (next, outcome)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
