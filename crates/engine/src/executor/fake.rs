// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake build executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BuildExecutor, ExecutionError};
use async_trait::async_trait;
use bq_core::{BuildJobQueueItem, BuildResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake does for one job
#[derive(Clone, Debug, PartialEq)]
pub enum FakeBehavior {
    Succeed,
    /// Runs, but the build itself fails
    FailBuild,
    Error(String),
    /// Never finishes on its own
    Hang,
}

#[derive(Default)]
struct FakeState {
    behaviors: HashMap<String, FakeBehavior>,
    started: Vec<String>,
    finished: Vec<String>,
    delay: Duration,
}

/// Records every execution and finishes after a configurable delay
#[derive(Clone, Default)]
pub struct FakeBuildExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBuildExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).delay = delay;
        self
    }

    pub fn set_behavior(&self, job_id: &str, behavior: FakeBehavior) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .behaviors
            .insert(job_id.to_string(), behavior);
    }

    /// Job ids in the order executions started
    pub fn started(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .started
            .clone()
    }

    /// Job ids whose executions ran to completion
    pub fn finished(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .finished
            .clone()
    }
}

#[async_trait]
impl BuildExecutor for FakeBuildExecutor {
    async fn execute(&self, job: &BuildJobQueueItem) -> Result<BuildResult, ExecutionError> {
        let (behavior, delay) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.started.push(job.id.clone());
            let behavior = state
                .behaviors
                .get(&job.id)
                .cloned()
                .unwrap_or(FakeBehavior::Succeed);
            (behavior, state.delay)
        };

        if behavior == FakeBehavior::Hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(delay).await;
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .finished
            .push(job.id.clone());

        match behavior {
            FakeBehavior::Error(message) => Err(ExecutionError::Crashed(message)),
            behavior => Ok(BuildResult {
                successful: behavior != FakeBehavior::FailBuild,
                branch: Some("main".to_string()),
                commit_hash: job.commit_hash.clone(),
                logs: vec![format!("built {}", job.id)],
            }),
        }
    }
}
