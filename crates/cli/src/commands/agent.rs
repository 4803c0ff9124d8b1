// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bq agents` and `bq agent`

use bq_core::{BuildAgentInformation, DistributedDataProvider};
use bq_engine::{BuildJobProducer, DistributedDataAccess};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Stop an agent from claiming; running builds go back to the queue after its grace period
    Pause {
        /// Agent short name
        name: String,
    },
    /// Let a paused agent claim again
    Resume {
        /// Agent short name
        name: String,
    },
}

#[derive(Debug, Serialize)]
pub struct AgentRow {
    pub name: String,
    pub display_name: String,
    pub member_address: String,
    pub status: String,
    pub running: usize,
    pub capacity: usize,
    pub running_jobs: Vec<String>,
}

impl From<&BuildAgentInformation> for AgentRow {
    fn from(info: &BuildAgentInformation) -> Self {
        Self {
            name: info.agent.name.clone(),
            display_name: info.agent.display_name.clone(),
            member_address: info.agent.member_address.clone(),
            status: info.status.to_string(),
            running: info.number_of_current_build_jobs,
            capacity: info.max_number_of_concurrent_build_jobs,
            running_jobs: info.running_build_jobs.iter().map(|j| j.id.clone()).collect(),
        }
    }
}

impl fmt::Display for AgentRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} {:<8} {}/{} {:<20} {}",
            self.name,
            self.status,
            self.running,
            self.capacity,
            self.member_address,
            self.running_jobs.join(",")
        )
    }
}

pub fn list<P: DistributedDataProvider>(
    access: &DistributedDataAccess<P>,
) -> anyhow::Result<Vec<AgentRow>> {
    Ok(access
        .agent_information()?
        .iter()
        .map(AgentRow::from)
        .collect())
}

#[derive(Debug, Serialize)]
pub struct Requested {
    pub agent: String,
    pub action: &'static str,
}

impl fmt::Display for Requested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Requested {} of {}", self.action, self.agent)
    }
}

/// Publish a pause or resume request; agents that are not running ignore it
pub fn control<P: DistributedDataProvider>(
    producer: &BuildJobProducer<P>,
    command: AgentCommand,
) -> anyhow::Result<Requested> {
    let (agent, action) = match command {
        AgentCommand::Pause { name } => {
            producer.pause_agent(&name)?;
            (name, "pause")
        }
        AgentCommand::Resume { name } => {
            producer.resume_agent(&name)?;
            (name, "resume")
        }
    };
    Ok(Requested { agent, action })
}
