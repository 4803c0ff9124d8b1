// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent capacity and history record
//!
//! Stored in the `buildAgentInformation` map keyed by agent name. Every
//! read-modify-write of an entry happens under the map lock for that name.

use crate::build_job::{BuildAgentRef, BuildJobQueueItem};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildAgentStatus {
    /// Running at least one job
    Active,
    #[default]
    Idle,
    /// Not accepting jobs until resumed
    Paused,
}

impl std::fmt::Display for BuildAgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("agent {agent} is already running {running} of {max} jobs")]
pub struct CapacityExceeded {
    pub agent: String,
    pub running: usize,
    pub max: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAgentInformation {
    pub agent: BuildAgentRef,
    pub max_number_of_concurrent_build_jobs: usize,
    pub number_of_current_build_jobs: usize,
    pub running_build_jobs: Vec<BuildJobQueueItem>,
    /// Oldest first, bounded by `recent_capacity`
    pub recent_build_jobs: Vec<BuildJobQueueItem>,
    pub recent_capacity: usize,
    pub status: BuildAgentStatus,
}

impl BuildAgentInformation {
    pub fn new(agent: BuildAgentRef, max_concurrent: usize, recent_capacity: usize) -> Self {
        Self {
            agent,
            max_number_of_concurrent_build_jobs: max_concurrent,
            number_of_current_build_jobs: 0,
            running_build_jobs: Vec::new(),
            recent_build_jobs: Vec::new(),
            recent_capacity,
            status: BuildAgentStatus::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.agent.name
    }

    pub fn has_capacity(&self) -> bool {
        self.number_of_current_build_jobs < self.max_number_of_concurrent_build_jobs
    }

    /// Whether the agent accepts new jobs at all
    pub fn is_available(&self) -> bool {
        self.status != BuildAgentStatus::Paused
    }

    /// Record a claimed job as running
    pub fn start_job(&mut self, job: BuildJobQueueItem) -> Result<(), CapacityExceeded> {
        if !self.has_capacity() {
            return Err(CapacityExceeded {
                agent: self.agent.name.clone(),
                running: self.number_of_current_build_jobs,
                max: self.max_number_of_concurrent_build_jobs,
            });
        }
        self.running_build_jobs.push(job);
        self.sync_count();
        Ok(())
    }

    /// Move a job from running into the recent history
    ///
    /// The oldest recent entries are evicted beyond capacity. Returns false
    /// if the job was not running here; it is still archived.
    pub fn finish_job(&mut self, job: BuildJobQueueItem) -> bool {
        let was_running = self.take_running(&job.id).is_some();
        self.recent_build_jobs.push(job);
        let overflow = self
            .recent_build_jobs
            .len()
            .saturating_sub(self.recent_capacity);
        self.recent_build_jobs.drain(..overflow);
        was_running
    }

    /// Drop a running job without archiving it
    pub fn release_job(&mut self, job_id: &str) -> Option<BuildJobQueueItem> {
        self.take_running(job_id)
    }

    /// Copy with only the recent history replaced
    pub fn with_recent_build_jobs(&self, recent: Vec<BuildJobQueueItem>) -> Self {
        Self {
            recent_build_jobs: recent,
            ..self.clone()
        }
    }

    pub fn pause(&mut self) {
        self.status = BuildAgentStatus::Paused;
    }

    pub fn resume(&mut self) {
        self.status = BuildAgentStatus::Idle;
        self.refresh_status();
    }

    /// Derive active/idle from the running count; paused is sticky
    pub fn refresh_status(&mut self) {
        if self.status == BuildAgentStatus::Paused {
            return;
        }
        self.status = if self.running_build_jobs.is_empty() {
            BuildAgentStatus::Idle
        } else {
            BuildAgentStatus::Active
        };
    }

    fn take_running(&mut self, job_id: &str) -> Option<BuildJobQueueItem> {
        let pos = self.running_build_jobs.iter().position(|j| j.id == job_id)?;
        let job = self.running_build_jobs.remove(pos);
        self.sync_count();
        Some(job)
    }

    fn sync_count(&mut self) {
        self.number_of_current_build_jobs = self.running_build_jobs.len();
        self.refresh_status();
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
