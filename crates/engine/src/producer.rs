// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server side of the queue: submitting, cancelling and cleaning up

use crate::access::{DistributedDataAccess, RequeueOutcome};
use crate::error::SchedulerError;
use bq_core::{
    BuildAgentRef, BuildJobQueueItem, BuildStatus, Clock, DataError, DistributedDataProvider,
    KeyGuard, SystemClock,
};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Still queued; removed before any agent saw it
    Dequeued,
    /// Running; its agent was asked to stop it
    Signalled,
}

/// Jobs recovered from agents that left the cluster
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub requeued: Vec<String>,
    pub failed: Vec<String>,
}

pub struct BuildJobProducer<P, C: Clock = SystemClock> {
    access: Arc<DistributedDataAccess<P>>,
    max_retries: u32,
    clock: C,
}

impl<P: DistributedDataProvider> BuildJobProducer<P> {
    pub fn new(access: Arc<DistributedDataAccess<P>>, max_retries: u32) -> Self {
        Self::with_clock(access, max_retries, SystemClock)
    }
}

impl<P: DistributedDataProvider, C: Clock> BuildJobProducer<P, C> {
    pub fn with_clock(access: Arc<DistributedDataAccess<P>>, max_retries: u32, clock: C) -> Self {
        Self {
            access,
            max_retries,
            clock,
        }
    }

    pub fn access(&self) -> &Arc<DistributedDataAccess<P>> {
        &self.access
    }

    /// Queue a job for the fleet
    ///
    /// Refused while no data member can hold it.
    pub fn enqueue(&self, job: BuildJobQueueItem) -> Result<(), SchedulerError> {
        if self.access.provider().no_data_member_in_cluster_available() {
            tracing::warn!(job_id = %job.id, "no data member in the cluster, not queueing");
            return Err(DataError::NoDataMember.into());
        }
        self.access.enqueue(&job)?;
        tracing::info!(
            job_id = %job.id,
            participation_id = job.participation_id,
            priority = job.priority,
            "queued build job"
        );
        Ok(())
    }

    pub fn cancel(&self, job_id: &str) -> Result<CancelOutcome, SchedulerError> {
        let queue = self.access.queue()?;
        let queued: Vec<_> = queue
            .get_all()?
            .into_iter()
            .filter(|reference| reference.id == job_id)
            .collect();
        if !queued.is_empty() && queue.remove_all(&queued)? {
            self.access.jobs()?.remove(&job_id.to_string())?;
            tracing::info!(job_id, "cancelled queued build job");
            return Ok(CancelOutcome::Dequeued);
        }

        // Not queued, or claimed between the snapshot and the removal
        let job = self
            .access
            .jobs()?
            .get(&job_id.to_string())?
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;
        if job.status != BuildStatus::Running {
            return Err(SchedulerError::JobNotFound(job_id.to_string()));
        }
        self.access.cancel_topic()?.publish(job_id.to_string())?;
        tracing::info!(
            job_id,
            agent = ?job.build_agent.map(|a| a.name),
            "signalled cancel to running build job"
        );
        Ok(CancelOutcome::Signalled)
    }

    /// Recover running jobs whose agent's member is no longer in the cluster
    pub fn requeue_orphaned_jobs(&self) -> Result<OrphanReport, SchedulerError> {
        let members = self.access.provider().cluster_member_addresses()?;
        let now = self.clock.utc();
        let mut report = OrphanReport::default();

        for job in self.access.processing_jobs()? {
            let Some(agent) = &job.build_agent else {
                continue;
            };
            if members.contains(&agent.member_address) {
                continue;
            }
            tracing::warn!(
                job_id = %job.id,
                agent = %agent.name,
                member = %agent.member_address,
                "job orphaned by departed member"
            );
            self.release_from_departed(agent, &job.id)?;
            match self
                .access
                .requeue_or_fail(&job, self.max_retries, now, "build agent left the cluster")?
            {
                RequeueOutcome::Requeued { .. } => report.requeued.push(job.id),
                RequeueOutcome::Failed => report.failed.push(job.id),
            }
        }
        Ok(report)
    }

    /// Take an orphaned job off the departed agent's running list
    ///
    /// An entry re-registered from another member is left alone.
    fn release_from_departed(
        &self,
        agent: &BuildAgentRef,
        job_id: &str,
    ) -> Result<(), SchedulerError> {
        let agents = self.access.agents()?;
        let _guard = KeyGuard::acquire(agents.as_ref(), agent.name.clone())?;
        let Some(mut info) = agents.get(&agent.name)? else {
            return Ok(());
        };
        if info.agent != *agent || info.release_job(job_id).is_none() {
            return Ok(());
        }
        agents.put(agent.name.clone(), info)?;
        Ok(())
    }

    /// Drop information entries of agents whose member left; returns their names
    pub fn remove_offline_agents(&self) -> Result<Vec<String>, SchedulerError> {
        let members: HashSet<String> = self.access.provider().cluster_member_addresses()?;
        let agents = self.access.agents()?;
        let mut removed = Vec::new();
        for info in self.access.agent_information()? {
            if members.contains(&info.agent.member_address) {
                continue;
            }
            agents.remove(&info.agent.name)?;
            tracing::info!(
                agent = %info.agent.name,
                member = %info.agent.member_address,
                "removed offline build agent"
            );
            removed.push(info.agent.name);
        }
        Ok(removed)
    }

    pub fn pause_agent(&self, agent_name: &str) -> Result<(), SchedulerError> {
        self.access.pause_topic()?.publish(agent_name.to_string())?;
        tracing::info!(agent = agent_name, "requested pause");
        Ok(())
    }

    pub fn resume_agent(&self, agent_name: &str) -> Result<(), SchedulerError> {
        self.access.resume_topic()?.publish(agent_name.to_string())?;
        tracing::info!(agent = agent_name, "requested resume");
        Ok(())
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
