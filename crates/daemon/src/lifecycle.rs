// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, backend connection, run, shutdown.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bq_adapters::{RedisDataProvider, RedisOptions};
use bq_core::{BackendKind, DataError, DistributedDataProvider};
use bq_engine::{
    BuildAgent, Config, ConfigError, DistributedDataAccess, SchedulerError, Worker, WorkerSettings,
};
use thiserror::Error;
use tracing::info;

use crate::executor::ShellExecutor;

/// Config file used when neither an argument nor `BQ_CONFIG` names one
pub const DEFAULT_CONFIG_FILE: &str = "bq.toml";

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to connect to {backend} backend: {source}")]
    Connect {
        backend: BackendKind,
        #[source]
        source: DataError,
    },

    #[error(
        "The {0} backend lives only inside this process, so no other process could \
         queue jobs for this agent; set [backend] kind = \"redis\""
    )]
    IsolatedBackend(BackendKind),

    #[error("Agent error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Could not determine log directory for {0}")]
    NoLogDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to read configuration from
///
/// An explicit path must exist; the default file is optional.
pub fn load_config(
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    cwd: &Path,
) -> Result<Config, LifecycleError> {
    if let Some(path) = explicit.or(env) {
        return Ok(Config::load(&path)?);
    }
    let default = cwd.join(DEFAULT_CONFIG_FILE);
    if default.exists() {
        Ok(Config::load(&default)?)
    } else {
        Ok(Config::default())
    }
}

/// Connect to the configured backend and run the agent until `shutdown` resolves
///
/// Only a backend shared between processes can feed the agent jobs.
pub async fn run(config: Config, shutdown: impl Future<Output = ()>) -> Result<(), LifecycleError> {
    let backend = config.backend.clone();
    let connect_error = |source| LifecycleError::Connect {
        backend: backend.kind,
        source,
    };
    info!(backend = %backend.kind, member = %backend.member_address(), "connecting");

    if !backend.kind.reaches_other_processes() {
        return Err(LifecycleError::IsolatedBackend(backend.kind));
    }

    let options = RedisOptions::from_config(&backend).map_err(connect_error)?;
    let provider = tokio::task::spawn_blocking(move || RedisDataProvider::connect(options))
        .await
        .map_err(SchedulerError::from)?
        .map_err(connect_error)?;
    serve(provider, &config, shutdown).await
}

async fn serve<P: DistributedDataProvider>(
    provider: P,
    config: &Config,
    shutdown: impl Future<Output = ()>,
) -> Result<(), LifecycleError> {
    let access = Arc::new(DistributedDataAccess::new(provider));
    let agent = Arc::new(BuildAgent::new(Arc::clone(&access), &config.agent)?);
    let executor = Arc::new(ShellExecutor::new(&config.executor));
    let settings = WorkerSettings::from_config(&config.agent, &config.executor);

    info!(
        agent = %agent.name(),
        max_concurrent = agent.max_concurrent(),
        command = %config.executor.command,
        "build agent ready"
    );
    let result = Worker::new(agent, executor, settings).run(shutdown).await;

    tokio::task::spawn_blocking(move || access.provider().shutdown())
        .await
        .map_err(SchedulerError::from)?;
    info!("Daemon shutdown complete");
    Ok(result?)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
