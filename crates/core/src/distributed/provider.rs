// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{DistributedMap, DistributedQueue, DistributedSet, DistributedTopic, Key, Payload};
use crate::config::BackendKind;
use crate::error::DataResult;
use std::collections::HashSet;
use std::sync::Arc;

/// Factory for named primitives plus cluster membership queries
///
/// Requesting an existing name with a different element type fails with
/// [`DataError::TypeMismatch`](crate::error::DataError::TypeMismatch).
pub trait DistributedDataProvider: Clone + Send + Sync + 'static {
    fn backend(&self) -> BackendKind;

    fn get_queue<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedQueue<T>>>;

    /// A queue that keeps elements sorted by `Ord`, FIFO among equals
    fn get_priority_queue<T: Payload + Ord>(
        &self,
        name: &str,
    ) -> DataResult<Arc<dyn DistributedQueue<T>>>;

    fn get_map<K: Key, V: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedMap<K, V>>>;

    fn get_set<E: Key>(&self, name: &str) -> DataResult<Arc<dyn DistributedSet<E>>>;

    fn get_topic<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedTopic<T>>>;

    /// Whether the backend client is started and live; never fails
    fn is_instance_running(&self) -> bool;

    fn local_member_address(&self) -> DataResult<String>;

    /// Point-in-time copy of every member's address
    fn cluster_member_addresses(&self) -> DataResult<HashSet<String>>;

    /// True when no member can run jobs or the instance is down
    fn no_data_member_in_cluster_available(&self) -> bool;

    /// Leave the cluster; further operations fail with `BackendNotActive`
    fn shutdown(&self);
}
