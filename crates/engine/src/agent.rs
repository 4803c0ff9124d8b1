// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One build agent's view of the shared queue
//!
//! Every change to the agent's information entry happens while holding the
//! map lock on the agent's name, so concurrent claims on one agent never
//! exceed its capacity.

use crate::access::{AgentMap, DistributedDataAccess, JobMap, JobQueue, RequeueOutcome};
use crate::config::AgentConfig;
use crate::error::SchedulerError;
use bq_core::{
    BuildAgentInformation, BuildAgentRef, BuildJobItemReference, BuildJobQueueItem, BuildResult,
    BuildStatus, Clock, DistributedDataProvider, KeyGuard, SystemClock,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a job left its agent
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub status: BuildStatus,
    pub result: BuildResult,
    pub error: Option<String>,
}

impl Completion {
    /// Status follows whether the build passed
    pub fn built(result: BuildResult) -> Self {
        let status = if result.successful {
            BuildStatus::Successful
        } else {
            BuildStatus::Failed
        };
        Self {
            status,
            result,
            error: None,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            status: BuildStatus::Error,
            result: BuildResult::default(),
            error: Some(error.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: BuildStatus::Cancelled,
            result: BuildResult::default(),
            error: None,
        }
    }
}

pub struct BuildAgent<P, C: Clock = SystemClock> {
    access: Arc<DistributedDataAccess<P>>,
    agent: BuildAgentRef,
    max_concurrent: usize,
    recent_capacity: usize,
    max_retries: u32,
    paused: AtomicBool,
    clock: C,
}

impl<P: DistributedDataProvider> BuildAgent<P> {
    pub fn new(
        access: Arc<DistributedDataAccess<P>>,
        config: &AgentConfig,
    ) -> Result<Self, SchedulerError> {
        Self::with_clock(access, config, SystemClock)
    }
}

impl<P: DistributedDataProvider, C: Clock> BuildAgent<P, C> {
    pub fn with_clock(
        access: Arc<DistributedDataAccess<P>>,
        config: &AgentConfig,
        clock: C,
    ) -> Result<Self, SchedulerError> {
        let address = access.provider().local_member_address()?;
        let agent = BuildAgentRef::new(&config.short_name, address)
            .with_display_name(config.display_name());
        Ok(Self {
            access,
            agent,
            max_concurrent: config.max_concurrent_builds,
            recent_capacity: config.recent_jobs_capacity,
            max_retries: config.max_retries,
            paused: AtomicBool::new(false),
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.agent.name
    }

    pub fn agent(&self) -> &BuildAgentRef {
        &self.agent
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn access(&self) -> &Arc<DistributedDataAccess<P>> {
        &self.access
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn fresh_information(&self) -> BuildAgentInformation {
        let mut info = BuildAgentInformation::new(
            self.agent.clone(),
            self.max_concurrent,
            self.recent_capacity,
        );
        if self.is_paused() {
            info.pause();
        }
        info
    }

    /// Publish this agent's information, requeueing jobs left running by a
    /// previous process with the same name
    ///
    /// A leftover is only requeued while the job entry still names the
    /// previous process as its agent.
    pub fn register(&self) -> Result<BuildAgentInformation, SchedulerError> {
        let agents = self.access.agents()?;
        let leftovers = {
            let _guard = KeyGuard::acquire(agents.as_ref(), self.agent.name.clone())?;
            let previous = agents.get(&self.agent.name)?;
            let info = match &previous {
                Some(old) => self
                    .fresh_information()
                    .with_recent_build_jobs(old.recent_build_jobs.clone()),
                None => self.fresh_information(),
            };
            agents.put(self.agent.name.clone(), info.clone())?;
            previous.map(|old| old.running_build_jobs).unwrap_or_default()
        };

        let jobs = self.access.jobs()?;
        let now = self.clock.utc();
        let mut requeued = 0;
        for leftover in &leftovers {
            match jobs.get(&leftover.id)? {
                Some(current)
                    if current.status == BuildStatus::Running
                        && current.build_agent == leftover.build_agent =>
                {
                    self.access
                        .requeue_or_fail(&current, self.max_retries, now, "agent restarted")?;
                    requeued += 1;
                }
                _ => tracing::debug!(job_id = %leftover.id, "leftover job already moved on"),
            }
        }
        tracing::info!(
            agent = %self.agent.name,
            address = %self.agent.member_address,
            max_concurrent = self.max_concurrent,
            requeued,
            "registered build agent"
        );
        self.information()
    }

    /// Re-create the entry if another member removed it
    pub fn refresh(&self) -> Result<(), SchedulerError> {
        if !self.access.agents()?.contains_key(&self.agent.name)? {
            tracing::warn!(
                agent = %self.agent.name,
                "agent information missing, registering again"
            );
            self.register()?;
        }
        Ok(())
    }

    pub fn information(&self) -> Result<BuildAgentInformation, SchedulerError> {
        Ok(self
            .access
            .agents()?
            .get(&self.agent.name)?
            .unwrap_or_else(|| self.fresh_information()))
    }

    /// Take the most urgent queued job if this agent has a free slot
    pub fn claim_next(&self) -> Result<Option<BuildJobQueueItem>, SchedulerError> {
        if self.is_paused() {
            return Ok(None);
        }
        let queue = self.access.queue()?;
        if queue.is_empty()? {
            return Ok(None);
        }

        let agents = self.access.agents()?;
        let jobs = self.access.jobs()?;
        let _guard = KeyGuard::acquire(agents.as_ref(), self.agent.name.clone())?;
        let info = agents
            .get(&self.agent.name)?
            .unwrap_or_else(|| self.fresh_information());
        if !info.has_capacity() || !info.is_available() {
            tracing::debug!(
                agent = %self.agent.name,
                running = info.number_of_current_build_jobs,
                status = %info.status,
                "no free slot"
            );
            return Ok(None);
        }

        loop {
            let Some(reference) = queue.poll()? else {
                return Ok(None);
            };
            let job = match jobs.get(&reference.id) {
                Ok(Some(job)) => job,
                Ok(None) => {
                    tracing::warn!(job_id = %reference.id, "job vanished before it was claimed");
                    continue;
                }
                Err(e) => {
                    requeue_reference(queue.as_ref(), reference);
                    return Err(e.into());
                }
            };
            if job.status == BuildStatus::Running {
                tracing::warn!(
                    job_id = %job.id,
                    agent = ?job.build_agent.as_ref().map(|a| &a.name),
                    "skipping stale reference to a running job"
                );
                continue;
            }

            let claimed = job.claimed_by(&self.agent, self.clock.utc());
            if let Err(e) = self.take(jobs.as_ref(), agents.as_ref(), &info, &claimed) {
                restore(queue.as_ref(), jobs.as_ref(), reference, job);
                return Err(e);
            }
            tracing::info!(
                agent = %self.agent.name,
                job_id = %claimed.id,
                retry_count = claimed.retry_count,
                "claimed build job"
            );
            return Ok(Some(claimed));
        }
    }

    /// Mark `claimed` as running on this agent; the caller holds the agent lock
    fn take(
        &self,
        jobs: &JobMap,
        agents: &AgentMap,
        info: &BuildAgentInformation,
        claimed: &BuildJobQueueItem,
    ) -> Result<(), SchedulerError> {
        let mut info = info.clone();
        info.start_job(claimed.clone())?;
        jobs.put(claimed.id.clone(), claimed.clone())?;
        agents.put(self.agent.name.clone(), info)?;
        Ok(())
    }

    /// Archive a finished job and hand its result to ingestion
    pub fn finish(
        &self,
        job: &BuildJobQueueItem,
        completion: Completion,
    ) -> Result<BuildJobQueueItem, SchedulerError> {
        let finished = job.finished(completion.status, self.clock.utc());
        self.update(|info| {
            if !info.finish_job(finished.clone()) {
                tracing::warn!(job_id = %job.id, "finished job was not in the running list");
            }
        })?;

        self.access.jobs()?.remove(&job.id)?;
        self.access
            .report(finished.clone(), completion.result, completion.error)?;
        tracing::info!(
            agent = %self.agent.name,
            job_id = %job.id,
            status = %finished.status,
            "finished build job"
        );
        Ok(finished)
    }

    /// Give up a job after a timeout or crash
    ///
    /// At the retry ceiling the job is failed and archived instead.
    pub fn requeue(
        &self,
        job: &BuildJobQueueItem,
        reason: &str,
    ) -> Result<RequeueOutcome, SchedulerError> {
        if job.retry_count >= self.max_retries {
            tracing::error!(
                job_id = %job.id,
                retries = job.retry_count,
                reason,
                "retry ceiling reached"
            );
            let completion = Completion {
                status: BuildStatus::Failed,
                result: BuildResult::default(),
                error: Some(reason.to_string()),
            };
            self.finish(job, completion)?;
            return Ok(RequeueOutcome::Failed);
        }
        self.release(job)?;
        Ok(self
            .access
            .requeue_or_fail(job, self.max_retries, self.clock.utc(), reason)?)
    }

    /// Put a job back as it was queued, without counting a retry
    pub fn return_to_queue(&self, job: &BuildJobQueueItem) -> Result<(), SchedulerError> {
        self.release(job)?;
        self.access.enqueue(&job.unclaimed())?;
        tracing::info!(agent = %self.agent.name, job_id = %job.id, "returned job to the queue");
        Ok(())
    }

    fn release(&self, job: &BuildJobQueueItem) -> Result<(), SchedulerError> {
        self.update(|info| {
            if info.release_job(&job.id).is_none() {
                tracing::warn!(job_id = %job.id, "released job was not in the running list");
            }
        })
    }

    /// Stop claiming; returns false if already paused
    pub fn pause(&self) -> Result<bool, SchedulerError> {
        if self.paused.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.update(BuildAgentInformation::pause)?;
        tracing::info!(agent = %self.agent.name, "paused build agent");
        Ok(true)
    }

    /// Resume claiming; returns false if not paused
    pub fn resume(&self) -> Result<bool, SchedulerError> {
        if !self.paused.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.update(BuildAgentInformation::resume)?;
        tracing::info!(agent = %self.agent.name, "resumed build agent");
        Ok(true)
    }

    /// Remove this agent's information entry
    pub fn deregister(&self) -> Result<(), SchedulerError> {
        let agents = self.access.agents()?;
        let removed = {
            let _guard = KeyGuard::acquire(agents.as_ref(), self.agent.name.clone())?;
            agents.remove(&self.agent.name)?
        };
        if let Some(info) = removed {
            if !info.running_build_jobs.is_empty() {
                tracing::warn!(
                    agent = %self.agent.name,
                    running = info.running_build_jobs.len(),
                    "deregistered with running jobs"
                );
            }
        }
        tracing::info!(agent = %self.agent.name, "deregistered build agent");
        Ok(())
    }

    /// Apply `change` to this agent's entry under its lock
    fn update(
        &self,
        change: impl FnOnce(&mut BuildAgentInformation),
    ) -> Result<(), SchedulerError> {
        let agents = self.access.agents()?;
        let _guard = KeyGuard::acquire(agents.as_ref(), self.agent.name.clone())?;
        let mut info = agents
            .get(&self.agent.name)?
            .unwrap_or_else(|| self.fresh_information());
        change(&mut info);
        agents.put(self.agent.name.clone(), info)?;
        Ok(())
    }
}

/// Undo a claim interrupted after its reference left the queue
fn restore(
    queue: &JobQueue,
    jobs: &JobMap,
    reference: BuildJobItemReference,
    job: BuildJobQueueItem,
) {
    let id = job.id.clone();
    if let Err(e) = jobs.put(id.clone(), job) {
        tracing::error!(
            job_id = %id,
            error = %e,
            "failed to restore job after an interrupted claim"
        );
    }
    requeue_reference(queue, reference);
}

fn requeue_reference(queue: &JobQueue, reference: BuildJobItemReference) {
    let id = reference.id.clone();
    match queue.add(reference) {
        Ok(_) => tracing::warn!(job_id = %id, "claim interrupted, reference returned to the queue"),
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "failed to return reference to the queue")
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
