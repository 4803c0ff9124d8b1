// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler services

use bq_core::{CapacityExceeded, DataError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from queueing, claiming and settling build jobs
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Capacity(#[from] CapacityExceeded),
    #[error("build job not found: {0}")]
    JobNotFound(String),
    #[error("background task failed: {0}")]
    Task(String),
}

impl SchedulerError {
    /// True when the cluster is unavailable rather than the request being wrong
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Data(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Errors loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid agent short name {0:?}: use lowercase letters, digits and dashes")]
    InvalidShortName(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
