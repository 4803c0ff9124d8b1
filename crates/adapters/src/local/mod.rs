// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-process backend
//!
//! Every handle lives in this process and values are held without
//! serialization. The process is its own single data member.

use crate::memory::Registry;
use crate::store::{Direct, Node, StoreFactory};
use bq_core::{
    BackendKind, DataError, DataResult, DistributedDataProvider, DistributedMap, DistributedQueue,
    DistributedSet, DistributedTopic, Key, LockConfig, Payload,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct LocalNode {
    address: String,
    running: AtomicBool,
}

impl Node for LocalNode {
    fn address(&self) -> &str {
        &self.address
    }

    fn ensure_active(&self) -> DataResult<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataError::BackendNotActive {
                backend: BackendKind::Local,
            })
        }
    }
}

/// Provider for standalone deployments and tests
#[derive(Clone)]
pub struct LocalDataProvider {
    node: Arc<LocalNode>,
    factory: StoreFactory<Direct>,
}

impl LocalDataProvider {
    pub fn new(address: impl Into<String>, lock_config: LockConfig) -> Self {
        let node = Arc::new(LocalNode {
            address: address.into(),
            running: AtomicBool::new(true),
        });
        let factory = StoreFactory::new(
            Arc::new(Registry::new()),
            Arc::clone(&node) as Arc<dyn Node>,
            Direct,
            lock_config,
        );
        tracing::info!(address = %node.address, "local data provider started");
        Self { node, factory }
    }
}

impl Default for LocalDataProvider {
    fn default() -> Self {
        Self::new("localhost", LockConfig::default())
    }
}

impl DistributedDataProvider for LocalDataProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Local
    }

    fn get_queue<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedQueue<T>>> {
        self.factory.queue(name)
    }

    fn get_priority_queue<T: Payload + Ord>(
        &self,
        name: &str,
    ) -> DataResult<Arc<dyn DistributedQueue<T>>> {
        self.factory.priority_queue(name)
    }

    fn get_map<K: Key, V: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedMap<K, V>>> {
        self.factory.map(name)
    }

    fn get_set<E: Key>(&self, name: &str) -> DataResult<Arc<dyn DistributedSet<E>>> {
        self.factory.set(name)
    }

    fn get_topic<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedTopic<T>>> {
        self.factory.topic(name)
    }

    fn is_instance_running(&self) -> bool {
        self.node.running.load(Ordering::SeqCst)
    }

    fn local_member_address(&self) -> DataResult<String> {
        self.node.ensure_active()?;
        Ok(self.node.address.clone())
    }

    fn cluster_member_addresses(&self) -> DataResult<HashSet<String>> {
        self.node.ensure_active()?;
        Ok(HashSet::from([self.node.address.clone()]))
    }

    fn no_data_member_in_cluster_available(&self) -> bool {
        !self.is_instance_running()
    }

    fn shutdown(&self) {
        if self.node.running.swap(false, Ordering::SeqCst) {
            tracing::info!(address = %self.node.address, "local data provider stopped");
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
