// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file for agents and operator tools

use crate::error::ConfigError;
use bq_core::BackendConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Every section is optional
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub agent: AgentConfig,
    pub executor: ExecutorConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Unique agent name, also the key of its information entry
    pub short_name: String,
    pub display_name: Option<String>,
    pub max_concurrent_builds: usize,
    pub recent_jobs_capacity: usize,
    /// Retries before a job is failed for good
    pub max_retries: u32,
    /// Backup poll of the queue in case a wake-up was missed
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    /// How long running jobs may finish after a pause before they are requeued
    #[serde(with = "humantime_serde")]
    pub pause_grace_period: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            short_name: "build-agent".to_string(),
            display_name: None,
            max_concurrent_builds: 1,
            recent_jobs_capacity: 20,
            max_retries: 5,
            check_interval: Duration::from_secs(10),
            pause_grace_period: Duration::from_secs(60),
        }
    }
}

impl AgentConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.short_name)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Shell command that performs one build
    pub command: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: "./build.sh".to_string(),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log file; stderr when unset
    pub path: Option<PathBuf>,
    /// Filter directives used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: None,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse and validate; `path` only labels errors
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_short_name(&self.agent.short_name) {
            return Err(ConfigError::InvalidShortName(self.agent.short_name.clone()));
        }
        if self.agent.max_concurrent_builds == 0 {
            return Err(ConfigError::Zero("agent.max_concurrent_builds"));
        }
        if self.agent.recent_jobs_capacity == 0 {
            return Err(ConfigError::Zero("agent.recent_jobs_capacity"));
        }
        if self.agent.check_interval.is_zero() {
            return Err(ConfigError::Zero("agent.check_interval"));
        }
        Ok(())
    }
}

fn is_valid_short_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
