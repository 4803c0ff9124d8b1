// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection and lock configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which transport backs the distributed primitives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single process, no real distribution
    #[default]
    Local,
    /// Clustered in-memory data grid
    Grid,
    /// Redis server shared by all processes
    Redis,
}

impl BackendKind {
    /// Whether state written here is visible to other processes
    ///
    /// Local and grid primitives live inside the process that created them.
    pub fn reaches_other_processes(&self) -> bool {
        matches!(self, Self::Redis)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Grid => "grid",
            Self::Redis => "redis",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "grid" => Ok(Self::Grid),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Per-key lock behaviour shared by every backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long a holder keeps a key lock without releasing it before another
    /// holder may reclaim it
    #[serde(with = "humantime_serde")]
    pub lease: Duration,
    /// How long a blocked `lock` waits before checking the key again
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl LockConfig {
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(60),
            retry_interval: Duration::from_millis(50),
        }
    }
}

/// The `[backend]` section of the configuration file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Connection URL (redis only)
    pub url: Option<String>,
    /// Address this process announces to the cluster
    pub member_address: Option<String>,
    /// Join as a coordination-only member that cannot run jobs
    pub lite_member: bool,
    pub lock: LockConfig,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// The configured member address, or one derived from the process id
    pub fn member_address(&self) -> String {
        self.member_address
            .clone()
            .unwrap_or_else(|| format!("member-{}", std::process::id()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
