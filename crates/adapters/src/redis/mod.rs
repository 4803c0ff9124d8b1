// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed primitives
//!
//! Every process holds a [`RedisClient`] proxy; the data lives on the Redis
//! server. Mutations run as Lua scripts that also publish the matching event
//! on a per-primitive channel, and members are discovered through the
//! connection names reported by `CLIENT LIST`.

mod map;
mod queue;
mod scripts;
mod set;
mod topic;

pub use map::RedisMap;
pub use queue::RedisQueue;
pub use set::RedisSet;
pub use topic::RedisTopic;

use crate::dispatch::Listeners;
use bq_core::{
    BackendConfig, BackendKind, DataError, DataResult, DistributedDataProvider, DistributedMap,
    DistributedQueue, DistributedSet, DistributedTopic, HolderId, Key, LockConfig, Payload,
};
use scripts::Scripts;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How often subscriber threads wake to check for shutdown
const SUBSCRIBER_POLL: Duration = Duration::from_millis(200);

/// Connection settings for one member
#[derive(Clone, Debug)]
pub struct RedisOptions {
    pub url: String,
    pub member_address: String,
    pub lite_member: bool,
    /// Prefix for every key, channel and member name
    pub namespace: String,
    pub lock: LockConfig,
}

impl RedisOptions {
    pub fn new(url: impl Into<String>, member_address: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            member_address: member_address.into(),
            lite_member: false,
            namespace: "bq".to_string(),
            lock: LockConfig::default(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> DataResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| DataError::Connection("backend.url is required for redis".into()))?;
        Ok(Self {
            lite_member: config.lite_member,
            lock: config.lock.clone(),
            ..Self::new(url, config.member_address())
        })
    }

    pub fn lite(mut self, lite: bool) -> Self {
        self.lite_member = lite;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn client_name(&self) -> String {
        let role = if self.lite_member { "lite" } else { "data" };
        format!("{}:{}:{}", self.namespace, role, self.member_address)
    }
}

pub(crate) fn connection_error(e: redis::RedisError) -> DataError {
    DataError::Connection(e.to_string())
}

/// Shared proxy to the Redis server for one member
pub struct RedisClient {
    options: RedisOptions,
    client: redis::Client,
    conn: Mutex<redis::Connection>,
    running: Arc<AtomicBool>,
    pub(crate) scripts: Scripts,
}

impl RedisClient {
    pub fn connect(options: RedisOptions) -> DataResult<Arc<Self>> {
        let client = redis::Client::open(options.url.as_str()).map_err(connection_error)?;
        let mut conn = client.get_connection().map_err(connection_error)?;
        redis::cmd("CLIENT")
            .arg("SETNAME")
            .arg(options.client_name())
            .query::<()>(&mut conn)
            .map_err(connection_error)?;
        tracing::info!(
            url = %options.url,
            member = %options.member_address,
            lite = options.lite_member,
            "connected to redis"
        );

        Ok(Arc::new(Self {
            options,
            client,
            conn: Mutex::new(conn),
            running: Arc::new(AtomicBool::new(true)),
            scripts: Scripts::load(),
        }))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn address(&self) -> &str {
        &self.options.member_address
    }

    pub(crate) fn lock_config(&self) -> &LockConfig {
        &self.options.lock
    }

    pub(crate) fn holder(&self) -> HolderId {
        HolderId::current_thread(&self.options.member_address)
    }

    pub(crate) fn key(&self, kind: &str, name: &str) -> String {
        format!("{}:{}:{}", self.options.namespace, kind, name)
    }

    pub(crate) fn channel(&self, kind: &str, name: &str) -> String {
        format!("{}:events:{}:{}", self.options.namespace, kind, name)
    }

    pub(crate) fn ensure_active(&self) -> DataResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(DataError::BackendNotActive {
                backend: BackendKind::Redis,
            })
        }
    }

    /// Run commands on the shared connection, reconnecting once if it dropped
    pub(crate) fn with_conn<R>(
        &self,
        f: impl Fn(&mut redis::Connection) -> redis::RedisResult<R>,
    ) -> DataResult<R> {
        self.ensure_active()?;
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        match f(&mut *conn) {
            Err(e) if e.is_connection_dropped() || e.is_io_error() => {
                tracing::warn!(error = %e, "redis connection dropped, reconnecting");
                *conn = self.client.get_connection().map_err(connection_error)?;
                redis::cmd("CLIENT")
                    .arg("SETNAME")
                    .arg(self.options.client_name())
                    .query::<()>(&mut *conn)
                    .map_err(connection_error)?;
                f(&mut *conn).map_err(connection_error)
            }
            result => result.map_err(connection_error),
        }
    }

    /// Fail if `name` was first used with another element type
    pub(crate) fn claim_type(&self, kind: &str, name: &str, type_tag: &str) -> DataResult<()> {
        let types_key = format!("{}:types", self.options.namespace);
        let field = format!("{kind}:{name}");
        let existing: String = self.with_conn(|con| {
            self.scripts
                .claim_type
                .key(&types_key)
                .arg(&field)
                .arg(type_tag)
                .invoke(con)
        })?;
        if existing == type_tag {
            Ok(())
        } else {
            Err(DataError::TypeMismatch {
                name: name.to_string(),
            })
        }
    }

    /// Block until the calling thread holds the lock stored at `lock_key`
    pub(crate) fn lock(&self, lock_key: &str) -> DataResult<()> {
        let holder = self.holder().to_string();
        let lease_ms = self.options.lock.lease.as_millis() as u64;
        loop {
            let acquired: i64 = self.with_conn(|con| {
                self.scripts
                    .lock
                    .key(lock_key)
                    .arg(&holder)
                    .arg(lease_ms)
                    .invoke(con)
            })?;
            if acquired == 1 {
                return Ok(());
            }
            std::thread::sleep(self.options.lock.retry_interval);
        }
    }

    pub(crate) fn unlock(&self, name: &str, lock_key: &str, key_desc: &str) -> DataResult<()> {
        let holder = self.holder();
        let remaining: i64 = self.with_conn(|con| {
            self.scripts
                .unlock
                .key(lock_key)
                .arg(holder.to_string())
                .invoke(con)
        })?;
        if remaining < 0 {
            return Err(DataError::LockNotHeld {
                name: name.to_string(),
                key: key_desc.to_string(),
                holder: holder.to_string(),
            });
        }
        Ok(())
    }

    /// Deliver every payload published on `channel` to `on_payload`
    ///
    /// Returns once the subscription is active, so no later publish is
    /// missed. Delivery happens on a dedicated thread.
    pub(crate) fn subscribe(
        &self,
        channel: String,
        on_payload: impl Fn(&str) + Send + 'static,
    ) -> DataResult<Subscription> {
        self.ensure_active()?;
        let conn = self.client.get_connection().map_err(connection_error)?;
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread_stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name(format!("bq-redis-{channel}"))
            .spawn(move || {
                let mut conn = conn;
                let mut pubsub = conn.as_pubsub();
                let subscribed = pubsub
                    .set_read_timeout(Some(SUBSCRIBER_POLL))
                    .and_then(|_| pubsub.subscribe(&channel));
                let failed = subscribed.is_err();
                let _ = ready_tx.send(subscribed);
                if failed {
                    return;
                }

                while !thread_stop.load(Ordering::SeqCst) && running.load(Ordering::SeqCst) {
                    match pubsub.get_message() {
                        Ok(msg) => match msg.get_payload::<String>() {
                            Ok(payload) => {
                                let delivered = std::panic::catch_unwind(
                                    std::panic::AssertUnwindSafe(|| on_payload(&payload)),
                                );
                                if delivered.is_err() {
                                    tracing::error!(%channel, "listener panicked");
                                }
                            }
                            Err(e) => tracing::warn!(%channel, error = %e, "unreadable event"),
                        },
                        Err(e) if e.is_timeout() => continue,
                        Err(e) => {
                            tracing::error!(%channel, error = %e, "subscription lost");
                            break;
                        }
                    }
                }
            })
            .map_err(|e| DataError::Connection(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Subscription { stop }),
            Ok(Err(e)) => Err(connection_error(e)),
            Err(_) => Err(DataError::Connection("subscriber thread exited".into())),
        }
    }

    /// Members currently connected under this namespace
    pub fn members(&self) -> DataResult<Vec<(String, bool)>> {
        let list: String = self.with_conn(|con| redis::cmd("CLIENT").arg("LIST").query(con))?;
        let prefix = format!("{}:", self.options.namespace);
        let mut members: Vec<(String, bool)> = list
            .lines()
            .filter_map(|line| {
                let name = line.split(' ').find_map(|field| field.strip_prefix("name="))?;
                let (role, address) = name.strip_prefix(&prefix)?.split_once(':')?;
                match role {
                    "data" => Some((address.to_string(), false)),
                    "lite" => Some((address.to_string(), true)),
                    _ => None,
                }
            })
            .collect();
        members.sort();
        members.dedup();
        Ok(members)
    }

    /// Leave the cluster; subscriber threads wind down on their next wake-up
    pub fn shutdown(&self) {
        if !self.is_running() {
            return;
        }
        let result = self.with_conn(|con| {
            redis::cmd("CLIENT")
                .arg("SETNAME")
                .arg("")
                .query::<()>(con)
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to clear client name");
        }
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(member = %self.options.member_address, "disconnected from redis");
    }
}

/// Stops its subscriber thread when dropped
pub(crate) struct Subscription {
    stop: Arc<AtomicBool>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Subscribe lazily, once per handle
pub(crate) fn ensure_subscribed(
    slot: &Mutex<Option<Subscription>>,
    subscribe: impl FnOnce() -> DataResult<Subscription>,
) -> DataResult<()> {
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    if slot.is_none() {
        *slot = Some(subscribe()?);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EventKind {
    Added,
    Updated,
    Removed,
}

impl From<EventKind> for bq_core::ChangeKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Added => Self::Added,
            EventKind::Updated => Self::Updated,
            EventKind::Removed => Self::Removed,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ItemEnvelope<T> {
    pub kind: EventKind,
    pub item: T,
}

#[derive(Deserialize)]
pub(crate) struct EntryEnvelope<K, V> {
    pub kind: EventKind,
    pub key: K,
    pub value: Option<V>,
    pub old: Option<V>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TopicEnvelope<T> {
    pub publisher: String,
    pub payload: T,
}

pub(crate) fn encode<T: Payload>(name: &str, value: &T) -> DataResult<String> {
    serde_json::to_string(value).map_err(|e| DataError::serialization(name, e))
}

pub(crate) fn decode<T: Payload>(name: &str, text: &str) -> DataResult<T> {
    serde_json::from_str(text).map_err(|e| DataError::serialization(name, e))
}

/// Registered listeners of one handle, shared with its subscriber thread
pub(crate) type Shared<L> = Arc<Listeners<L>>;

#[derive(Clone)]
pub struct RedisDataProvider {
    client: Arc<RedisClient>,
}

impl RedisDataProvider {
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }

    pub fn connect(options: RedisOptions) -> DataResult<Self> {
        Ok(Self::new(RedisClient::connect(options)?))
    }

    pub fn client(&self) -> &Arc<RedisClient> {
        &self.client
    }
}

impl DistributedDataProvider for RedisDataProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn get_queue<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedQueue<T>>> {
        self.client
            .claim_type("queue", name, std::any::type_name::<T>())?;
        Ok(Arc::new(RedisQueue::<T>::fifo(Arc::clone(&self.client), name)))
    }

    fn get_priority_queue<T: Payload + Ord>(
        &self,
        name: &str,
    ) -> DataResult<Arc<dyn DistributedQueue<T>>> {
        let tag = format!("priority<{}>", std::any::type_name::<T>());
        self.client.claim_type("queue", name, &tag)?;
        Ok(Arc::new(RedisQueue::<T>::ordered(Arc::clone(&self.client), name)))
    }

    fn get_map<K: Key, V: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedMap<K, V>>> {
        let tag = format!("{}->{}", std::any::type_name::<K>(), std::any::type_name::<V>());
        self.client.claim_type("map", name, &tag)?;
        Ok(Arc::new(RedisMap::<K, V>::new(Arc::clone(&self.client), name)))
    }

    fn get_set<E: Key>(&self, name: &str) -> DataResult<Arc<dyn DistributedSet<E>>> {
        self.client
            .claim_type("set", name, std::any::type_name::<E>())?;
        Ok(Arc::new(RedisSet::<E>::new(Arc::clone(&self.client), name)))
    }

    fn get_topic<T: Payload>(&self, name: &str) -> DataResult<Arc<dyn DistributedTopic<T>>> {
        self.client
            .claim_type("topic", name, std::any::type_name::<T>())?;
        Ok(Arc::new(RedisTopic::<T>::new(Arc::clone(&self.client), name)))
    }

    fn is_instance_running(&self) -> bool {
        self.client.is_running()
    }

    fn local_member_address(&self) -> DataResult<String> {
        self.client.ensure_active()?;
        Ok(self.client.address().to_string())
    }

    fn cluster_member_addresses(&self) -> DataResult<HashSet<String>> {
        Ok(self
            .client
            .members()?
            .into_iter()
            .map(|(address, _)| address)
            .collect())
    }

    fn no_data_member_in_cluster_available(&self) -> bool {
        match self.client.members() {
            Ok(members) => members.iter().all(|(_, lite)| *lite),
            Err(e) => {
                tracing::debug!(error = %e, "membership unavailable");
                true
            }
        }
    }

    fn shutdown(&self) {
        self.client.shutdown();
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
