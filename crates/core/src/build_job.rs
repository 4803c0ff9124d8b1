// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job payloads carried by the distributed primitives

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Lifecycle status of a build job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    #[default]
    Queued,
    Running,
    Successful,
    Failed,
    Error,
    Cancelled,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Identity of a build agent
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildAgentRef {
    /// Unique short name, also the agent's key in the information map
    pub name: String,
    pub member_address: String,
    pub display_name: String,
}

impl BuildAgentRef {
    pub fn new(name: impl Into<String>, member_address: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            member_address: member_address.into(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTimingInfo {
    pub submission_date: DateTime<Utc>,
    pub build_start_date: Option<DateTime<Utc>>,
    pub build_completion_date: Option<DateTime<Utc>>,
    pub estimated_duration_secs: Option<u64>,
}

impl JobTimingInfo {
    pub fn submitted_at(at: DateTime<Utc>) -> Self {
        Self {
            submission_date: at,
            build_start_date: None,
            build_completion_date: None,
            estimated_duration_secs: None,
        }
    }
}

/// The full record of a build job
///
/// Lives in the `buildJobs` map while queued or running. Only its
/// [`BuildJobItemReference`] travels through the queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJobQueueItem {
    pub id: String,
    pub name: String,
    pub participation_id: u64,
    pub course_id: u64,
    pub exercise_id: u64,
    /// Lower runs first
    pub priority: i32,
    pub commit_hash: Option<String>,
    /// Image the build runs in
    #[serde(default)]
    pub docker_image: Option<String>,
    pub retry_count: u32,
    pub build_agent: Option<BuildAgentRef>,
    pub status: BuildStatus,
    pub timing: JobTimingInfo,
}

impl BuildJobQueueItem {
    pub fn new(
        id: impl Into<String>,
        participation_id: u64,
        course_id: u64,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            participation_id,
            course_id,
            exercise_id: 0,
            priority: 2,
            commit_hash: None,
            docker_image: None,
            retry_count: 0,
            build_agent: None,
            status: BuildStatus::Queued,
            timing: JobTimingInfo::submitted_at(submitted_at),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_exercise(mut self, exercise_id: u64) -> Self {
        self.exercise_id = exercise_id;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_commit_hash(mut self, commit_hash: impl Into<String>) -> Self {
        self.commit_hash = Some(commit_hash.into());
        self
    }

    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = Some(image.into());
        self
    }

    pub fn with_estimated_duration(mut self, secs: u64) -> Self {
        self.timing.estimated_duration_secs = Some(secs);
        self
    }

    pub fn reference(&self) -> BuildJobItemReference {
        BuildJobItemReference {
            id: self.id.clone(),
            participation_id: self.participation_id,
            course_id: self.course_id,
            priority: self.priority,
            submission_date: self.timing.submission_date,
        }
    }

    /// Copy assigned to an agent and stamped with the build start
    pub fn claimed_by(&self, agent: &BuildAgentRef, at: DateTime<Utc>) -> Self {
        let mut claimed = self.clone();
        claimed.build_agent = Some(agent.clone());
        claimed.status = BuildStatus::Running;
        claimed.timing.build_start_date = Some(at);
        claimed
    }

    /// Copy in a terminal status, stamped with the completion time
    pub fn finished(&self, status: BuildStatus, at: DateTime<Utc>) -> Self {
        let mut done = self.clone();
        done.status = status;
        done.timing.build_completion_date = Some(at);
        done
    }

    /// Back to queued with no agent, keeping the retry count
    ///
    /// Keeps the original submission date so the job does not lose its place.
    pub fn unclaimed(&self) -> Self {
        let mut queued = self.clone();
        queued.build_agent = None;
        queued.status = BuildStatus::Queued;
        queued.timing.build_start_date = None;
        queued.timing.build_completion_date = None;
        queued
    }

    /// Copy ready to be queued again, with its retry count incremented
    pub fn for_retry(&self) -> Self {
        let mut retry = self.unclaimed();
        retry.retry_count += 1;
        retry
    }

    pub fn is_claimed_by(&self, agent_name: &str) -> bool {
        self.build_agent
            .as_ref()
            .map(|a| a.name == agent_name)
            .unwrap_or(false)
    }
}

/// Queue payload pointing at a [`BuildJobQueueItem`]
///
/// Ordered by priority, then submission date, then id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildJobItemReference {
    pub id: String,
    pub participation_id: u64,
    pub course_id: u64,
    pub priority: i32,
    pub submission_date: DateTime<Utc>,
}

impl Ord for BuildJobItemReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.submission_date.cmp(&other.submission_date))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for BuildJobItemReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Output of an executed build
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub successful: bool,
    pub branch: Option<String>,
    pub commit_hash: Option<String>,
    pub logs: Vec<String>,
}

/// A finished job on its way to result processing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultQueueItem {
    pub build_job: BuildJobQueueItem,
    pub result: BuildResult,
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "build_job_tests.rs"]
mod tests;
