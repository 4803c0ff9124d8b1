// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Backends for the distributed data layer

mod dispatch;
pub mod grid;
pub mod local;
mod memory;
pub mod redis;
pub mod store;
pub mod traced;

#[cfg(test)]
mod contract;

pub use grid::{GridCluster, GridDataProvider, GridInstance, MemberInfo};
pub use local::LocalDataProvider;
pub use redis::{RedisClient, RedisDataProvider, RedisOptions};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
#[cfg(any(test, feature = "test-support"))]
pub use testing::Recorder;
