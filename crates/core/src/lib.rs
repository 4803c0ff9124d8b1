// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bq-core: distributed data contracts and the build-job domain model
//!
//! This crate provides:
//! - Listener contracts and the queue/map/set/topic primitive traits
//! - The `DistributedDataProvider` factory trait
//! - A lease lock state machine used by backend key locks
//! - Build job, agent and image cache records

pub mod agent;
pub mod build_job;
pub mod clock;
pub mod config;
pub mod distributed;
pub mod docker;
pub mod error;
pub mod listener;
pub mod lock;

pub use agent::{BuildAgentInformation, BuildAgentStatus, CapacityExceeded};
pub use build_job::{
    BuildAgentRef, BuildJobItemReference, BuildJobQueueItem, BuildResult, BuildStatus,
    JobTimingInfo, ResultQueueItem,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BackendConfig, BackendKind, LockConfig};
pub use distributed::{
    DistributedDataProvider, DistributedMap, DistributedQueue, DistributedSet, DistributedTopic,
    Key, KeyGuard, Payload,
};
pub use docker::DockerImageBuild;
pub use error::{DataError, DataResult};
pub use listener::{
    ChangeEvent, ChangeKind, ChangeListener, EntryChange, EntryEvent, EntryListener, ItemChange,
    ItemEvent, ItemListener, ListenerId, Message, MessageListener,
};
pub use lock::{HolderId, LeaseInput, LeaseLock, LeaseOutcome, LeaseState};
