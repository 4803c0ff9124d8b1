// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend-agnostic distributed primitives
//!
//! Every primitive is identified by a cluster-wide name. Two handles obtained
//! with the same name from any process share state.

mod map;
mod provider;
mod queue;
mod set;
mod topic;

pub use map::{DistributedMap, KeyGuard};
pub use provider::DistributedDataProvider;
pub use queue::DistributedQueue;
pub use set::DistributedSet;
pub use topic::DistributedTopic;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Values that can be stored in a distributed primitive
pub trait Payload:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
}

impl<T> Payload for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
}

/// Values usable as map keys or set elements
pub trait Key: Payload + Eq + Hash {}

impl<T> Key for T where T: Payload + Eq + Hash {}
