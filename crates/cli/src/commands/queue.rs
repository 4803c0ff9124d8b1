// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bq queue`, `bq submit`, `bq cancel` and `bq requeue-orphans`

use crate::output::truncate;
use anyhow::Context;
use bq_core::{BuildJobQueueItem, DistributedDataProvider};
use bq_engine::{BuildJobProducer, CancelOutcome, DistributedDataAccess};
use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued build jobs in claim order
    List {
        /// Only jobs of this course
        #[arg(long)]
        course: Option<u64>,
        /// Only jobs of this participation
        #[arg(long, conflicts_with = "course")]
        participation: Option<u64>,
    },
    /// List running build jobs
    Running {
        /// Only jobs claimed by this agent
        #[arg(long)]
        agent: Option<String>,
        /// Only jobs of this course
        #[arg(long, conflicts_with = "agent")]
        course: Option<u64>,
    },
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Participation the build belongs to
    #[arg(long)]
    pub participation: u64,
    /// Course the participation belongs to
    #[arg(long)]
    pub course: u64,
    #[arg(long, default_value = "0")]
    pub exercise: u64,
    /// Job id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
    /// Priority (lower = claimed first)
    #[arg(long, default_value = "2")]
    pub priority: i32,
    /// Commit to build
    #[arg(long)]
    pub commit: Option<String>,
    /// Image to build in
    #[arg(long)]
    pub image: Option<String>,
}

impl SubmitArgs {
    fn into_job(self) -> BuildJobQueueItem {
        let id = self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = self
            .name
            .unwrap_or_else(|| format!("participation-{}", self.participation));
        let mut job = BuildJobQueueItem::new(id, self.participation, self.course, Utc::now())
            .with_name(name)
            .with_exercise(self.exercise)
            .with_priority(self.priority);
        job.commit_hash = self.commit;
        if let Some(image) = self.image {
            job = job.with_docker_image(image);
        }
        job
    }
}

/// One build job as a table row
#[derive(Debug, Serialize)]
pub struct JobRow {
    pub id: String,
    pub name: String,
    pub participation_id: u64,
    pub course_id: u64,
    pub priority: i32,
    pub retry_count: u32,
    pub status: String,
    pub agent: Option<String>,
}

impl From<&BuildJobQueueItem> for JobRow {
    fn from(job: &BuildJobQueueItem) -> Self {
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            participation_id: job.participation_id,
            course_id: job.course_id,
            priority: job.priority,
            retry_count: job.retry_count,
            status: job.status.to_string(),
            agent: job.build_agent.as_ref().map(|a| a.name.clone()),
        }
    }
}

impl fmt::Display for JobRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {:<20} course={:<5} pri={:<3} retries={:<2} {:<10} {}",
            truncate(&self.id, 12),
            truncate(&self.name, 20),
            self.course_id,
            self.priority,
            self.retry_count,
            self.status,
            self.agent.as_deref().unwrap_or("-")
        )
    }
}

pub fn list<P: DistributedDataProvider>(
    access: &DistributedDataAccess<P>,
    course: Option<u64>,
    participation: Option<u64>,
) -> anyhow::Result<Vec<JobRow>> {
    let jobs = match (course, participation) {
        (Some(course), _) => access.queued_jobs_for_course(course)?,
        (None, Some(participation)) => access.queued_jobs_for_participation(participation)?,
        (None, None) => access.queued_jobs()?,
    };
    Ok(jobs.iter().map(JobRow::from).collect())
}

pub fn running<P: DistributedDataProvider>(
    access: &DistributedDataAccess<P>,
    agent: Option<&str>,
    course: Option<u64>,
) -> anyhow::Result<Vec<JobRow>> {
    let jobs = match (agent, course) {
        (Some(agent), _) => access.processing_jobs_for_agent(agent)?,
        (None, Some(course)) => access.processing_jobs_for_course(course)?,
        (None, None) => access.processing_jobs()?,
    };
    Ok(jobs.iter().map(JobRow::from).collect())
}

#[derive(Debug, Serialize)]
pub struct Submitted {
    pub id: String,
    pub priority: i32,
}

impl fmt::Display for Submitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queued {} (priority {})", self.id, self.priority)
    }
}

pub fn submit<P: DistributedDataProvider>(
    producer: &BuildJobProducer<P>,
    args: SubmitArgs,
) -> anyhow::Result<Submitted> {
    let job = args.into_job();
    let submitted = Submitted {
        id: job.id.clone(),
        priority: job.priority,
    };
    producer
        .enqueue(job)
        .with_context(|| format!("failed to queue {}", submitted.id))?;
    Ok(submitted)
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelKind {
    Dequeued,
    Signalled,
}

#[derive(Debug, Serialize)]
pub struct Cancelled {
    pub id: String,
    pub outcome: CancelKind,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            CancelKind::Dequeued => write!(f, "Removed {} from the queue", self.id),
            CancelKind::Signalled => write!(f, "Asked the agent running {} to cancel it", self.id),
        }
    }
}

pub fn cancel<P: DistributedDataProvider>(
    producer: &BuildJobProducer<P>,
    job_id: &str,
) -> anyhow::Result<Cancelled> {
    let outcome = producer
        .cancel(job_id)
        .with_context(|| format!("failed to cancel {job_id}"))?;
    Ok(Cancelled {
        id: job_id.to_string(),
        outcome: match outcome {
            CancelOutcome::Dequeued => CancelKind::Dequeued,
            CancelOutcome::Signalled => CancelKind::Signalled,
        },
    })
}

#[derive(Debug, Serialize)]
pub struct OrphanSummary {
    pub requeued: Vec<String>,
    pub failed: Vec<String>,
    pub removed_agents: Vec<String>,
}

impl fmt::Display for OrphanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Requeued {} job(s), failed {} at the retry limit, removed {} offline agent(s)",
            self.requeued.len(),
            self.failed.len(),
            self.removed_agents.len()
        )?;
        for id in &self.requeued {
            write!(f, "\n  requeued {id}")?;
        }
        for id in &self.failed {
            write!(f, "\n  failed   {id}")?;
        }
        for name in &self.removed_agents {
            write!(f, "\n  removed  {name}")?;
        }
        Ok(())
    }
}

/// Re-queue orphaned jobs, then drop the agents that held them
pub fn requeue_orphans<P: DistributedDataProvider>(
    producer: &BuildJobProducer<P>,
) -> anyhow::Result<OrphanSummary> {
    let report = producer.requeue_orphaned_jobs()?;
    let removed_agents = producer.remove_offline_agents()?;
    Ok(OrphanSummary {
        requeued: report.requeued,
        failed: report.failed,
        removed_agents,
    })
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
