// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Build queue scheduling services
//!
//! Everything here talks to the cluster through a `DistributedDataProvider`,
//! so the same services run on the local, grid and redis backends.

pub mod access;
mod agent;
pub mod config;
mod error;
mod executor;
mod images;
mod producer;
mod worker;

pub use access::{DistributedDataAccess, RequeueOutcome};
pub use agent::{BuildAgent, Completion};
pub use config::{AgentConfig, Config, ExecutorConfig, LogConfig};
pub use error::{ConfigError, SchedulerError};
pub use executor::{BuildExecutor, ExecutionError};
#[cfg(any(test, feature = "test-support"))]
pub use executor::{FakeBehavior, FakeBuildExecutor};
pub use images::DockerImageCache;
pub use producer::{BuildJobProducer, CancelOutcome, OrphanReport};
pub use worker::{Worker, WorkerSettings};
