// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named primitives of the build-job queue and read helpers over them
//!
//! Handles are created on first use and cached; the queue and the two maps
//! are wrapped in traced handles.

use bq_adapters::traced;
use bq_core::{
    BuildAgentInformation, BuildAgentStatus, BuildJobItemReference, BuildJobQueueItem,
    BuildResult, BuildStatus, DataResult, DistributedDataProvider, DistributedMap,
    DistributedQueue, DistributedTopic, DockerImageBuild, ResultQueueItem,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Fixed primitive names shared by every process
pub mod names {
    pub const BUILD_JOB_QUEUE: &str = "buildJobQueue";
    pub const BUILD_JOBS: &str = "buildJobs";
    pub const BUILD_AGENT_INFORMATION: &str = "buildAgentInformation";
    pub const BUILD_RESULT_QUEUE: &str = "buildResultQueue";
    pub const DOCKER_IMAGE_CLEANUP_INFO: &str = "dockerImageCleanupInfo";
    pub const CANCELED_BUILD_JOBS_TOPIC: &str = "canceledBuildJobsTopic";
    pub const PAUSE_BUILD_AGENT_TOPIC: &str = "pauseBuildAgentTopic";
    pub const RESUME_BUILD_AGENT_TOPIC: &str = "resumeBuildAgentTopic";
}

pub type JobQueue = dyn DistributedQueue<BuildJobItemReference>;
pub type JobMap = dyn DistributedMap<String, BuildJobQueueItem>;
pub type AgentMap = dyn DistributedMap<String, BuildAgentInformation>;
pub type ResultQueue = dyn DistributedQueue<ResultQueueItem>;
pub type ImageMap = dyn DistributedMap<String, DockerImageBuild>;
pub type NameTopic = dyn DistributedTopic<String>;

/// A handle created on first successful request
struct Cached<T: ?Sized> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T: ?Sized> Cached<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn get_or_create(&self, create: impl FnOnce() -> DataResult<Arc<T>>) -> DataResult<Arc<T>> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = create()?;
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    #[cfg(test)]
    fn install(&self, handle: Arc<T>) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }
}

/// What happened to a job that could not finish on its agent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequeueOutcome {
    Requeued { retry_count: u32 },
    /// Retry ceiling reached; the job was failed and reported
    Failed,
}

pub struct DistributedDataAccess<P> {
    provider: P,
    queue: Cached<JobQueue>,
    jobs: Cached<JobMap>,
    agents: Cached<AgentMap>,
    results: Cached<ResultQueue>,
    images: Cached<ImageMap>,
    cancel_topic: Cached<NameTopic>,
    pause_topic: Cached<NameTopic>,
    resume_topic: Cached<NameTopic>,
}

impl<P: DistributedDataProvider> DistributedDataAccess<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            queue: Cached::new(),
            jobs: Cached::new(),
            agents: Cached::new(),
            results: Cached::new(),
            images: Cached::new(),
            cancel_topic: Cached::new(),
            pause_topic: Cached::new(),
            resume_topic: Cached::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Replace the job and agent map handles before first use
    #[cfg(test)]
    pub(crate) fn install_maps(&self, jobs: Arc<JobMap>, agents: Arc<AgentMap>) {
        self.jobs.install(jobs);
        self.agents.install(agents);
    }

    /// Priority queue of job references, most urgent first
    pub fn queue(&self) -> DataResult<Arc<JobQueue>> {
        self.queue.get_or_create(|| {
            let queue = self.provider.get_priority_queue(names::BUILD_JOB_QUEUE)?;
            Ok(traced::queue(queue))
        })
    }

    /// Full items of every queued or running job, keyed by id
    pub fn jobs(&self) -> DataResult<Arc<JobMap>> {
        self.jobs.get_or_create(|| {
            let jobs = self.provider.get_map(names::BUILD_JOBS)?;
            Ok(traced::map(jobs))
        })
    }

    /// Agent information keyed by agent short name
    pub fn agents(&self) -> DataResult<Arc<AgentMap>> {
        self.agents.get_or_create(|| {
            let agents = self.provider.get_map(names::BUILD_AGENT_INFORMATION)?;
            Ok(traced::map(agents))
        })
    }

    pub fn results(&self) -> DataResult<Arc<ResultQueue>> {
        self.results
            .get_or_create(|| self.provider.get_queue(names::BUILD_RESULT_QUEUE))
    }

    pub fn images(&self) -> DataResult<Arc<ImageMap>> {
        self.images
            .get_or_create(|| self.provider.get_map(names::DOCKER_IMAGE_CLEANUP_INFO))
    }

    pub fn cancel_topic(&self) -> DataResult<Arc<NameTopic>> {
        self.cancel_topic
            .get_or_create(|| self.provider.get_topic(names::CANCELED_BUILD_JOBS_TOPIC))
    }

    pub fn pause_topic(&self) -> DataResult<Arc<NameTopic>> {
        self.pause_topic
            .get_or_create(|| self.provider.get_topic(names::PAUSE_BUILD_AGENT_TOPIC))
    }

    pub fn resume_topic(&self) -> DataResult<Arc<NameTopic>> {
        self.resume_topic
            .get_or_create(|| self.provider.get_topic(names::RESUME_BUILD_AGENT_TOPIC))
    }

    /// Queued jobs in dequeue order
    pub fn queued_jobs(&self) -> DataResult<Vec<BuildJobQueueItem>> {
        let references = self.queue()?.get_all()?;
        let ids: HashSet<String> = references.iter().map(|r| r.id.clone()).collect();
        let mut found = self.jobs()?.get_all(&ids)?;
        Ok(references
            .iter()
            .filter_map(|reference| {
                let job = found.remove(&reference.id);
                if job.is_none() {
                    tracing::warn!(job_id = %reference.id, "queued reference has no job");
                }
                job
            })
            .collect())
    }

    pub fn queued_jobs_for_course(&self, course_id: u64) -> DataResult<Vec<BuildJobQueueItem>> {
        Ok(self
            .queued_jobs()?
            .into_iter()
            .filter(|job| job.course_id == course_id)
            .collect())
    }

    pub fn queued_jobs_for_participation(
        &self,
        participation_id: u64,
    ) -> DataResult<Vec<BuildJobQueueItem>> {
        Ok(self
            .queued_jobs()?
            .into_iter()
            .filter(|job| job.participation_id == participation_id)
            .collect())
    }

    /// Running jobs, oldest start first
    pub fn processing_jobs(&self) -> DataResult<Vec<BuildJobQueueItem>> {
        let mut running: Vec<_> = self
            .jobs()?
            .values()?
            .into_iter()
            .filter(|job| job.status == BuildStatus::Running)
            .collect();
        running.sort_by(|a, b| {
            a.timing
                .build_start_date
                .cmp(&b.timing.build_start_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(running)
    }

    pub fn processing_jobs_for_course(&self, course_id: u64) -> DataResult<Vec<BuildJobQueueItem>> {
        Ok(self
            .processing_jobs()?
            .into_iter()
            .filter(|job| job.course_id == course_id)
            .collect())
    }

    pub fn processing_jobs_for_participation(
        &self,
        participation_id: u64,
    ) -> DataResult<Vec<BuildJobQueueItem>> {
        Ok(self
            .processing_jobs()?
            .into_iter()
            .filter(|job| job.participation_id == participation_id)
            .collect())
    }

    pub fn processing_jobs_for_agent(
        &self,
        agent_name: &str,
    ) -> DataResult<Vec<BuildJobQueueItem>> {
        Ok(self
            .processing_jobs()?
            .into_iter()
            .filter(|job| job.is_claimed_by(agent_name))
            .collect())
    }

    pub fn processing_job_ids(&self) -> DataResult<HashSet<String>> {
        Ok(self
            .processing_jobs()?
            .into_iter()
            .map(|job| job.id)
            .collect())
    }

    pub fn result_queue_size(&self) -> DataResult<usize> {
        self.results()?.size()
    }

    pub fn agent_information_map(&self) -> DataResult<HashMap<String, BuildAgentInformation>> {
        self.agents()?.map_copy()
    }

    /// Registered agents sorted by name
    pub fn agent_information(&self) -> DataResult<Vec<BuildAgentInformation>> {
        let mut agents: Vec<_> = self.agents()?.values()?;
        agents.sort_by(|a, b| a.agent.name.cmp(&b.agent.name));
        Ok(agents)
    }

    pub fn agent_status(&self, agent_name: &str) -> DataResult<Option<BuildAgentStatus>> {
        Ok(self
            .agents()?
            .get(&agent_name.to_string())?
            .map(|info| info.status))
    }

    /// Write the full item, then make it visible to agents
    pub fn enqueue(&self, job: &BuildJobQueueItem) -> DataResult<()> {
        self.jobs()?.put(job.id.clone(), job.clone())?;
        self.queue()?.add(job.reference())?;
        Ok(())
    }

    /// Put a job back in the queue with one more retry, or fail it at the ceiling
    ///
    /// The caller has already removed the job from its agent's running list.
    pub fn requeue_or_fail(
        &self,
        job: &BuildJobQueueItem,
        max_retries: u32,
        now: DateTime<Utc>,
        reason: &str,
    ) -> DataResult<RequeueOutcome> {
        if job.retry_count >= max_retries {
            tracing::error!(
                job_id = %job.id,
                retries = job.retry_count,
                reason,
                "retry ceiling reached, failing job"
            );
            let failed = job.finished(BuildStatus::Failed, now);
            self.jobs()?.remove(&job.id)?;
            self.report(failed, BuildResult::default(), Some(reason.to_string()))?;
            return Ok(RequeueOutcome::Failed);
        }

        let retry = job.for_retry();
        tracing::info!(job_id = %job.id, retry_count = retry.retry_count, reason, "requeueing job");
        self.enqueue(&retry)?;
        Ok(RequeueOutcome::Requeued {
            retry_count: retry.retry_count,
        })
    }

    /// Hand a finished job to result ingestion
    pub fn report(
        &self,
        job: BuildJobQueueItem,
        result: BuildResult,
        error: Option<String>,
    ) -> DataResult<()> {
        let result = BuildResult {
            commit_hash: result.commit_hash.or_else(|| job.commit_hash.clone()),
            ..result
        };
        self.results()?.add(ResultQueueItem {
            build_job: job,
            result,
            error,
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "access_tests.rs"]
mod tests;
