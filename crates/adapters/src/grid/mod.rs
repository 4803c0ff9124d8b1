// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clustered in-memory data grid backend
//!
//! A [`GridCluster`] owns the partitioned state; each process-level member
//! joins it and receives a [`GridInstance`] handle. Values cross the member
//! boundary as JSON bytes. Lite members coordinate but hold no data, so a
//! cluster without data members cannot serve operations.

use crate::memory::Registry;
use crate::store::{Json, Node, StoreFactory};
use bq_core::{
    BackendKind, DataError, DataResult, DistributedDataProvider, DistributedMap, DistributedQueue,
    DistributedSet, DistributedTopic, Key, LockConfig, Payload,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberInfo {
    pub address: String,
    /// Coordination only, cannot hold data or run jobs
    pub lite: bool,
}

pub struct GridCluster {
    name: String,
    registry: Arc<Registry>,
    members: Mutex<Vec<MemberInfo>>,
}

impl GridCluster {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            registry: Arc::new(Registry::new()),
            members: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a member under a unique address
    pub fn join(
        self: &Arc<Self>,
        address: impl Into<String>,
        lite: bool,
    ) -> DataResult<Arc<GridInstance>> {
        let address = address.into();
        let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        if members.iter().any(|m| m.address == address) {
            return Err(DataError::Connection(format!(
                "member address {address} already in cluster {}",
                self.name
            )));
        }
        members.push(MemberInfo {
            address: address.clone(),
            lite,
        });
        tracing::info!(
            cluster = %self.name,
            %address,
            lite,
            members = members.len(),
            "member joined"
        );

        Ok(Arc::new(GridInstance {
            cluster: Arc::clone(self),
            address,
            lite,
            running: AtomicBool::new(true),
        }))
    }

    /// Point-in-time copy of the member list
    pub fn members(&self) -> Vec<MemberInfo> {
        self.members
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn has_data_member(&self) -> bool {
        self.members
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| !m.lite)
    }

    fn leave(&self, address: &str) {
        let remaining_data = {
            let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
            members.retain(|m| m.address != address);
            members.iter().filter(|m| !m.lite).count()
        };
        self.registry.release_member(address);
        tracing::info!(cluster = %self.name, address, "member left");

        if remaining_data == 0 {
            tracing::warn!(cluster = %self.name, "last data member left, cluster data lost");
            self.registry.discard_all();
        }
    }
}

/// One member's handle on the cluster
pub struct GridInstance {
    cluster: Arc<GridCluster>,
    address: String,
    lite: bool,
    running: AtomicBool,
}

impl GridInstance {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_lite(&self) -> bool {
        self.lite
    }

    pub fn cluster(&self) -> &Arc<GridCluster> {
        &self.cluster
    }

    /// Leave the cluster, releasing this member's locks and listeners
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.cluster.leave(&self.address);
        }
    }
}

impl Node for GridInstance {
    fn address(&self) -> &str {
        &self.address
    }

    fn ensure_active(&self) -> DataResult<()> {
        if !self.is_running() {
            return Err(DataError::BackendNotActive {
                backend: BackendKind::Grid,
            });
        }
        if !self.cluster.has_data_member() {
            return Err(DataError::NoDataMember);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct GridDataProvider {
    instance: Arc<GridInstance>,
    factory: StoreFactory<Json>,
}

impl GridDataProvider {
    pub fn new(instance: Arc<GridInstance>, lock_config: LockConfig) -> Self {
        let factory = StoreFactory::new(
            Arc::clone(&instance.cluster.registry),
            Arc::clone(&instance) as Arc<dyn Node>,
            Json,
            lock_config,
        );
        Self { instance, factory }
    }

    /// Join `cluster` and wrap the membership in a provider
    pub fn join(
        cluster: &Arc<GridCluster>,
        address: impl Into<String>,
        lite: bool,
        lock_config: LockConfig,
    ) -> DataResult<Self> {
        Ok(Self::new(cluster.join(address, lite)?, lock_config))
    }

    pub fn instance(&self) -> &Arc<GridInstance> {
        &self.instance
    }
}

impl DistributedDataProvider for GridDataProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Grid
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
        self.instance.is_running()
    }

    fn local_member_address(&self) -> DataResult<String> {
        if !self.instance.is_running() {
            return Err(DataError::BackendNotActive {
                backend: BackendKind::Grid,
            });
        }
        Ok(self.instance.address.clone())
    }

    fn cluster_member_addresses(&self) -> DataResult<HashSet<String>> {
        if !self.instance.is_running() {
            return Err(DataError::BackendNotActive {
                backend: BackendKind::Grid,
            });
        }
        Ok(self
            .instance
            .cluster
            .members()
            .into_iter()
            .map(|m| m.address)
            .collect())
    }

    fn no_data_member_in_cluster_available(&self) -> bool {
        !self.instance.is_running() || !self.instance.cluster.has_data_member()
    }

    fn shutdown(&self) {
        self.instance.shutdown();
    }
}

#[cfg(test)]
#[path = "grid_tests.rs"]
mod tests;
