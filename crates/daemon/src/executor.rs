// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs builds as a shell command

use async_trait::async_trait;
use bq_core::{BuildJobQueueItem, BuildResult};
use bq_engine::{BuildExecutor, ExecutionError, ExecutorConfig};
use std::path::PathBuf;
use std::process::Stdio;

/// Runs `executor.command` through `sh -c`, one process per job
///
/// The job is described to the command through `BQ_*` environment variables.
/// Dropping the execution kills the process.
pub struct ShellExecutor {
    command: String,
    cwd: Option<PathBuf>,
}

impl ShellExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            command: config.command.clone(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

fn job_env(job: &BuildJobQueueItem) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("BQ_JOB_ID", job.id.clone()),
        ("BQ_PARTICIPATION_ID", job.participation_id.to_string()),
        ("BQ_COURSE_ID", job.course_id.to_string()),
        (
            "BQ_COMMIT_HASH",
            job.commit_hash.clone().unwrap_or_default(),
        ),
    ];
    if let Some(image) = &job.docker_image {
        env.push(("BQ_DOCKER_IMAGE", image.clone()));
    }
    env
}

#[async_trait]
impl BuildExecutor for ShellExecutor {
    async fn execute(&self, job: &BuildJobQueueItem) -> Result<BuildResult, ExecutionError> {
        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .envs(job_env(job))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .await
            .map_err(|e| ExecutionError::Spawn(e.to_string()))?;

        let Some(exit_code) = output.status.code() else {
            return Err(ExecutionError::Crashed(format!(
                "build command terminated by signal ({})",
                output.status
            )));
        };
        if !output.stderr.is_empty() {
            tracing::debug!(
                job_id = %job.id,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "build stderr"
            );
        }

        let logs = String::from_utf8_lossy(&output.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&output.stderr).lines())
            .map(str::to_string)
            .collect();
        tracing::info!(job_id = %job.id, exit_code, "build command exited");

        Ok(BuildResult {
            successful: exit_code == 0,
            branch: None,
            commit_hash: job.commit_hash.clone(),
            logs,
        })
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
