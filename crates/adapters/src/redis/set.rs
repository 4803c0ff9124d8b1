// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{
    decode, encode, ensure_subscribed, EventKind, ItemEnvelope, RedisClient, Shared, Subscription,
};
use crate::dispatch::Listeners;
use crate::store::TokenTable;
use bq_core::{DataResult, DistributedSet, ItemChange, ItemListener, Key, ListenerId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set stored as a Redis set of JSON members
pub struct RedisSet<E> {
    client: Arc<RedisClient>,
    name: String,
    key: String,
    channel: String,
    listeners: Shared<dyn ItemListener<E>>,
    subscription: Mutex<Option<Subscription>>,
    tokens: TokenTable,
}

impl<E: Key> RedisSet<E> {
    pub fn new(client: Arc<RedisClient>, name: &str) -> Self {
        Self {
            key: client.key("set", name),
            channel: client.channel("set", name),
            client,
            name: name.to_string(),
            listeners: Arc::new(Listeners::new()),
            subscription: Mutex::new(None),
            tokens: TokenTable::default(),
        }
    }

    fn encode_all(&self, elements: &[E]) -> DataResult<Vec<String>> {
        elements.iter().map(|e| encode(&self.name, e)).collect()
    }

    fn run(&self, script: &redis::Script, members: &[String]) -> DataResult<bool> {
        if members.is_empty() {
            self.client.ensure_active()?;
            return Ok(false);
        }
        let changed: i64 = self.client.with_conn(|con| {
            let mut invocation = script.prepare_invoke();
            invocation.key(&self.key).key(&self.channel);
            for member in members {
                invocation.arg(member);
            }
            invocation.invoke(con)
        })?;
        Ok(changed > 0)
    }
}

impl<E: Key> DistributedSet<E> for RedisSet<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, element: E) -> DataResult<bool> {
        self.add_all(vec![element])
    }

    fn add_all(&self, elements: Vec<E>) -> DataResult<bool> {
        let members = self.encode_all(&elements)?;
        self.run(&self.client.scripts.set_add, &members)
    }

    fn remove(&self, element: &E) -> DataResult<bool> {
        self.remove_all(std::slice::from_ref(element))
    }

    fn remove_all(&self, elements: &[E]) -> DataResult<bool> {
        let members = self.encode_all(elements)?;
        self.run(&self.client.scripts.set_remove, &members)
    }

    fn contains(&self, element: &E) -> DataResult<bool> {
        let member = encode(&self.name, element)?;
        self.client
            .with_conn(|con| redis::cmd("SISMEMBER").arg(&self.key).arg(&member).query(con))
    }

    fn contains_all(&self, elements: &[E]) -> DataResult<bool> {
        let members = self.encode_all(elements)?;
        if members.is_empty() {
            self.client.ensure_active()?;
            return Ok(true);
        }
        let found: Vec<bool> = self.client.with_conn(|con| {
            let mut pipe = redis::pipe();
            for member in &members {
                pipe.cmd("SISMEMBER").arg(&self.key).arg(member);
            }
            pipe.query(con)
        })?;
        Ok(found.into_iter().all(|present| present))
    }

    fn size(&self) -> DataResult<usize> {
        self.client
            .with_conn(|con| redis::cmd("SCARD").arg(&self.key).query(con))
    }

    fn clear(&self) -> DataResult<()> {
        self.client.with_conn(|con| {
            self.client
                .scripts
                .set_clear
                .key(&self.key)
                .key(&self.channel)
                .invoke::<i64>(con)
        })?;
        Ok(())
    }

    fn set_copy(&self) -> DataResult<HashSet<E>> {
        let members: Vec<String> = self
            .client
            .with_conn(|con| redis::cmd("SMEMBERS").arg(&self.key).query(con))?;
        members.iter().map(|m| decode(&self.name, m)).collect()
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<E>>) -> DataResult<ListenerId> {
        ensure_subscribed(&self.subscription, || {
            let listeners = Arc::clone(&self.listeners);
            let name = self.name.clone();
            self.client.subscribe(self.channel.clone(), move |payload| {
                let envelope = match serde_json::from_str::<ItemEnvelope<E>>(payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::error!(set = %name, error = %e, "dropping undecodable event");
                        return;
                    }
                };
                let change = match envelope.kind {
                    EventKind::Removed => ItemChange::Removed(envelope.item),
                    EventKind::Added | EventKind::Updated => ItemChange::Added(envelope.item),
                };
                for listener in listeners.snapshot() {
                    change.deliver(&name, listener.as_ref());
                }
            })
        })?;
        let native = self.listeners.add(self.client.address(), listener);
        Ok(self.tokens.insert(native))
    }

    fn remove_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !self.listeners.remove(native) {
                    tracing::debug!(set = %self.name, %id, "listener already released");
                }
            }
            None => tracing::warn!(set = %self.name, %id, "unknown listener id"),
        }
    }
}
