// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bq status`

use bq_core::{BackendKind, BuildAgentStatus, DistributedDataProvider};
use bq_engine::DistributedDataAccess;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct Status {
    pub backend: BackendKind,
    pub member: String,
    pub members: Vec<String>,
    pub queued: usize,
    pub running: usize,
    pub results: usize,
    pub agents: usize,
    pub paused_agents: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend:  {} (as {})", self.backend, self.member)?;
        writeln!(f, "Members:  {}", self.members.join(", "))?;
        writeln!(f, "Queued:   {}", self.queued)?;
        writeln!(f, "Running:  {}", self.running)?;
        writeln!(f, "Results:  {}", self.results)?;
        write!(f, "Agents:   {} ({} paused)", self.agents, self.paused_agents)
    }
}

pub fn status<P: DistributedDataProvider>(
    access: &DistributedDataAccess<P>,
) -> anyhow::Result<Status> {
    let provider = access.provider();
    let mut members: Vec<String> = provider.cluster_member_addresses()?.into_iter().collect();
    members.sort();
    let agents = access.agent_information()?;

    Ok(Status {
        backend: provider.backend(),
        member: provider.local_member_address()?,
        members,
        queued: access.queue()?.size()?,
        running: access.processing_job_ids()?.len(),
        results: access.result_queue_size()?,
        agents: agents.len(),
        paused_agents: agents
            .iter()
            .filter(|info| info.status == BuildAgentStatus::Paused)
            .count(),
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
