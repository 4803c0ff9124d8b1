// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by distributed primitives and providers

use crate::config::BackendKind;
use thiserror::Error;

/// Errors from distributed data operations
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{backend} backend is not active")]
    BackendNotActive { backend: BackendKind },
    #[error("no data member available in the cluster")]
    NoDataMember,
    #[error("failed to (de)serialize value of {name}: {message}")]
    Serialization { name: String, message: String },
    #[error("{name} already exists with a different element type")]
    TypeMismatch { name: String },
    #[error("lock on {name}[{key}] is not held by {holder}")]
    LockNotHeld {
        name: String,
        key: String,
        holder: String,
    },
    #[error("backend connection error: {0}")]
    Connection(String),
}

impl DataError {
    pub fn serialization(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Serialization {
            name: name.into(),
            message: error.to_string(),
        }
    }

    /// Whether the caller should simply try again later
    ///
    /// Serialization and type errors are configuration problems and never heal
    /// on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendNotActive { .. } | Self::NoDataMember | Self::Connection(_)
        )
    }
}

pub type DataResult<T> = Result<T, DataError>;
