// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations
//!
//! Each command takes the data access layer for whichever backend the
//! configuration selects and returns something printable.

pub mod agent;
pub mod queue;
pub mod status;

use crate::output::{self, OutputFormat};
use anyhow::bail;
use bq_core::{BackendKind, DistributedDataProvider};
use bq_engine::{BuildJobProducer, Config, DistributedDataAccess};
use clap::Subcommand;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum Command {
    /// Show cluster members, queue sizes and agent counts
    Status,
    /// Inspect queued and running build jobs
    Queue(queue::QueueArgs),
    /// Queue a build job
    Submit(queue::SubmitArgs),
    /// Cancel a queued or running build job
    Cancel {
        /// Build job id
        job_id: String,
    },
    /// List build agents
    Agents,
    /// Control a build agent
    Agent(agent::AgentArgs),
    /// Re-queue jobs held by agents that left the cluster
    RequeueOrphans,
}

impl Command {
    /// Name as typed on the command line
    fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Queue(_) => "queue",
            Self::Submit(_) => "submit",
            Self::Cancel { .. } => "cancel",
            Self::Agents => "agents",
            Self::Agent(args) => match args.command {
                agent::AgentCommand::Pause { .. } => "agent pause",
                agent::AgentCommand::Resume { .. } => "agent resume",
            },
            Self::RequeueOrphans => "requeue-orphans",
        }
    }

    /// Whether build agents in other processes must see the effect
    pub fn changes_shared_state(&self) -> bool {
        matches!(
            self,
            Self::Submit(_) | Self::Cancel { .. } | Self::Agent(_) | Self::RequeueOrphans
        )
    }

    /// Refuse changes that would be lost when this process exits
    pub fn check_backend(&self, kind: BackendKind) -> anyhow::Result<()> {
        if self.changes_shared_state() && !kind.reaches_other_processes() {
            bail!(
                "`bq {}` cannot reach build agents through the {kind} backend, \
                 which lives only inside this process; set [backend] kind = \"redis\"",
                self.name()
            );
        }
        Ok(())
    }
}

/// Run `command` against `provider`, then leave the cluster
pub fn execute<P: DistributedDataProvider>(
    provider: P,
    config: &Config,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let access = Arc::new(DistributedDataAccess::new(provider));
    let result = run(&access, config, command, format);
    access.provider().shutdown();
    result
}

fn run<P: DistributedDataProvider>(
    access: &Arc<DistributedDataAccess<P>>,
    config: &Config,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let producer = BuildJobProducer::new(Arc::clone(access), config.agent.max_retries);
    match command {
        Command::Status => output::print(&status::status(access)?, format),
        Command::Queue(args) => match args.command {
            queue::QueueCommand::List {
                course,
                participation,
            } => {
                let jobs = queue::list(access, course, participation)?;
                output::print_list(&jobs, "No queued build jobs", format);
            }
            queue::QueueCommand::Running { agent, course } => {
                let jobs = queue::running(access, agent.as_deref(), course)?;
                output::print_list(&jobs, "No running build jobs", format);
            }
        },
        Command::Submit(args) => output::print(&queue::submit(&producer, args)?, format),
        Command::Cancel { job_id } => output::print(&queue::cancel(&producer, &job_id)?, format),
        Command::Agents => {
            let agents = agent::list(access)?;
            output::print_list(&agents, "No build agents", format);
        }
        Command::Agent(args) => output::print(&agent::control(&producer, args.command)?, format),
        Command::RequeueOrphans => {
            output::print(&queue::requeue_orphans(&producer)?, format)
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
