// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the scheduler and whatever actually runs a build

use async_trait::async_trait;
use bq_core::{BuildJobQueueItem, BuildResult};
use thiserror::Error;

/// The build could not be run; a build that ran and failed is a `BuildResult`
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start build: {0}")]
    Spawn(String),
    #[error("build crashed: {0}")]
    Crashed(String),
}

#[async_trait]
pub trait BuildExecutor: Send + Sync + 'static {
    async fn execute(&self, job: &BuildJobQueueItem) -> Result<BuildResult, ExecutionError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBuildExecutor, FakeBehavior};
