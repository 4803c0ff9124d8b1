// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bq - build queue operator tool

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;

use anyhow::{Context, Result};
use bq_adapters::{
    GridCluster, GridDataProvider, LocalDataProvider, RedisDataProvider, RedisOptions,
};
use bq_core::BackendKind;
use bq_engine::Config;
use clap::Parser;
use commands::Command;
use output::OutputFormat;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "bq.toml";

#[derive(Parser)]
#[command(
    name = "bq",
    version,
    about = "Build queue - inspect and control distributed build agents"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "BQ_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    connect_and_execute(&config, cli.command, cli.format)
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => PathBuf::from(DEFAULT_CONFIG_FILE),
        None => return Ok(Config::default()),
    };
    Config::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Join the configured backend as an operator member
fn connect_and_execute(config: &Config, command: Command, format: OutputFormat) -> Result<()> {
    let backend = &config.backend;
    command.check_backend(backend.kind)?;
    let member = backend
        .member_address
        .clone()
        .unwrap_or_else(|| format!("bq-cli-{}", std::process::id()));
    tracing::debug!(backend = %backend.kind, %member, "connecting");

    match backend.kind {
        BackendKind::Local => {
            let provider = LocalDataProvider::new(member, backend.lock.clone());
            commands::execute(provider, config, command, format)
        }
        BackendKind::Grid => {
            let cluster = GridCluster::new("bq");
            let provider =
                GridDataProvider::join(&cluster, member, backend.lite_member, backend.lock.clone())
                    .context("joining grid cluster")?;
            commands::execute(provider, config, command, format)
        }
        BackendKind::Redis => {
            let options = RedisOptions {
                member_address: member,
                ..RedisOptions::from_config(backend)?
            };
            let provider = RedisDataProvider::connect(options).context("connecting to redis")?;
            commands::execute(provider, config, command, format)
        }
    }
}
