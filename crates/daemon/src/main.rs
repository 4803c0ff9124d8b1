// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build Queue Agent Daemon (bqd)
//!
//! Joins the configured cluster as a build agent and runs queued build jobs
//! until SIGTERM or SIGINT.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod executor;
mod lifecycle;

use std::path::PathBuf;

use bq_engine::LogConfig;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::LifecycleError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let env = std::env::var_os("BQ_CONFIG").map(PathBuf::from);
    let config = lifecycle::load_config(explicit, env, &std::env::current_dir()?)?;

    // Set up logging
    let log_guard = setup_logging(&config.log)?;

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };

    info!(pid = std::process::id(), "Starting bqd");
    if let Err(e) = lifecycle::run(config, shutdown).await {
        error!("Daemon failed: {}", e);
        drop(log_guard);
        return Err(e.into());
    }

    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &LogConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let Some(path) = &config.path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .ok_or_else(|| LifecycleError::NoLogDir(path.clone()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| LifecycleError::NoLogDir(path.clone()))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
