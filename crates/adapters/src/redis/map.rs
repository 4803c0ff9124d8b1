// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{
    decode, encode, ensure_subscribed, EntryEnvelope, EventKind, RedisClient, Shared,
    Subscription,
};
use crate::dispatch::Listeners;
use crate::store::TokenTable;
use bq_core::{
    ChangeEvent, ChangeListener, DataResult, DistributedMap, EntryChange, EntryListener, Key,
    ListenerId, Payload,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Map stored as a Redis hash keyed by the JSON form of each key
pub struct RedisMap<K, V> {
    client: Arc<RedisClient>,
    name: String,
    key: String,
    channel: String,
    entry_listeners: Shared<dyn EntryListener<K, V>>,
    change_listeners: Shared<dyn ChangeListener>,
    subscription: Mutex<Option<Subscription>>,
    tokens: TokenTable,
}

impl<K: Key, V: Payload> RedisMap<K, V> {
    pub fn new(client: Arc<RedisClient>, name: &str) -> Self {
        Self {
            key: client.key("map", name),
            channel: client.channel("map", name),
            client,
            name: name.to_string(),
            entry_listeners: Arc::new(Listeners::new()),
            change_listeners: Arc::new(Listeners::new()),
            subscription: Mutex::new(None),
            tokens: TokenTable::default(),
        }
    }

    fn field(&self, key: &K) -> DataResult<String> {
        encode(&self.name, key)
    }

    fn lock_key(&self, key: &K) -> DataResult<String> {
        let field = self.field(key)?;
        Ok(self.client.key("lock", &format!("{}:{}", self.name, field)))
    }

    fn decode_value(&self, text: Option<String>) -> DataResult<Option<V>> {
        text.map(|t| decode(&self.name, &t)).transpose()
    }

    fn entries(&self) -> DataResult<Vec<(K, V)>> {
        let raw: HashMap<String, String> = self
            .client
            .with_conn(|con| redis::cmd("HGETALL").arg(&self.key).query(con))?;
        raw.iter()
            .map(|(k, v)| Ok((decode(&self.name, k)?, decode(&self.name, v)?)))
            .collect()
    }

    fn subscribe(&self) -> DataResult<()> {
        ensure_subscribed(&self.subscription, || {
            let entries = Arc::clone(&self.entry_listeners);
            let changes = Arc::clone(&self.change_listeners);
            let name = self.name.clone();
            self.client.subscribe(self.channel.clone(), move |payload| {
                let Some(change) = entry_change::<K, V>(&name, payload) else {
                    return;
                };
                for listener in entries.snapshot() {
                    change.deliver(&name, listener.as_ref());
                }
                for listener in changes.snapshot() {
                    listener.changed(ChangeEvent {
                        source: name.clone(),
                        kind: change.kind(),
                    });
                }
            })
        })
    }
}

pub(crate) fn entry_change<K: Key, V: Payload>(
    name: &str,
    payload: &str,
) -> Option<EntryChange<K, V>> {
    let envelope = match serde_json::from_str::<EntryEnvelope<K, V>>(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(map = name, error = %e, "dropping undecodable event");
            return None;
        }
    };
    let change = match (envelope.kind, envelope.value, envelope.old) {
        (EventKind::Added, Some(value), _) => EntryChange::Added {
            key: envelope.key,
            value,
        },
        (EventKind::Updated, Some(value), Some(old_value)) => EntryChange::Updated {
            key: envelope.key,
            value,
            old_value,
        },
        (EventKind::Removed, _, Some(old_value)) => EntryChange::Removed {
            key: envelope.key,
            old_value,
        },
        (kind, _, _) => {
            tracing::error!(map = name, ?kind, "event is missing its values");
            return None;
        }
    };
    Some(change)
}

impl<K: Key, V: Payload> DistributedMap<K, V> for RedisMap<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &K) -> DataResult<Option<V>> {
        let field = self.field(key)?;
        let value: Option<String> = self
            .client
            .with_conn(|con| redis::cmd("HGET").arg(&self.key).arg(&field).query(con))?;
        self.decode_value(value)
    }

    fn get_all(&self, keys: &HashSet<K>) -> DataResult<HashMap<K, V>> {
        if keys.is_empty() {
            self.client.ensure_active()?;
            return Ok(HashMap::new());
        }
        let requested: Vec<&K> = keys.iter().collect();
        let fields = requested
            .iter()
            .map(|k| self.field(k))
            .collect::<DataResult<Vec<_>>>()?;
        let values: Vec<Option<String>> = self
            .client
            .with_conn(|con| redis::cmd("HMGET").arg(&self.key).arg(&fields).query(con))?;
        let mut found = HashMap::new();
        for (key, value) in requested.into_iter().zip(values) {
            if let Some(value) = self.decode_value(value)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    fn put(&self, key: K, value: V) -> DataResult<Option<V>> {
        let field = self.field(&key)?;
        let value = encode(&self.name, &value)?;
        let old: Option<String> = self.client.with_conn(|con| {
            self.client
                .scripts
                .map_put
                .key(&self.key)
                .key(&self.channel)
                .arg(&field)
                .arg(&value)
                .invoke(con)
        })?;
        self.decode_value(old)
    }

    fn remove(&self, key: &K) -> DataResult<Option<V>> {
        let field = self.field(key)?;
        let old: Option<String> = self.client.with_conn(|con| {
            self.client
                .scripts
                .map_remove
                .key(&self.key)
                .key(&self.channel)
                .arg(&field)
                .invoke(con)
        })?;
        self.decode_value(old)
    }

    fn contains_key(&self, key: &K) -> DataResult<bool> {
        let field = self.field(key)?;
        self.client
            .with_conn(|con| redis::cmd("HEXISTS").arg(&self.key).arg(&field).query(con))
    }

    fn values(&self) -> DataResult<Vec<V>> {
        let raw: Vec<String> = self
            .client
            .with_conn(|con| redis::cmd("HVALS").arg(&self.key).query(con))?;
        raw.iter().map(|v| decode(&self.name, v)).collect()
    }

    fn key_set(&self) -> DataResult<HashSet<K>> {
        let raw: Vec<String> = self
            .client
            .with_conn(|con| redis::cmd("HKEYS").arg(&self.key).query(con))?;
        raw.iter().map(|k| decode(&self.name, k)).collect()
    }

    fn entry_set(&self) -> DataResult<Vec<(K, V)>> {
        self.entries()
    }

    fn map_copy(&self) -> DataResult<HashMap<K, V>> {
        Ok(self.entries()?.into_iter().collect())
    }

    fn size(&self) -> DataResult<usize> {
        self.client
            .with_conn(|con| redis::cmd("HLEN").arg(&self.key).query(con))
    }

    fn clear(&self) -> DataResult<()> {
        self.client.with_conn(|con| {
            self.client
                .scripts
                .map_clear
                .key(&self.key)
                .key(&self.channel)
                .invoke::<i64>(con)
        })?;
        Ok(())
    }

    fn lock(&self, key: &K) -> DataResult<()> {
        self.client.lock(&self.lock_key(key)?)
    }

    fn unlock(&self, key: &K) -> DataResult<()> {
        self.client
            .unlock(&self.name, &self.lock_key(key)?, &format!("{key:?}"))
    }

    fn add_entry_listener(
        &self,
        listener: Arc<dyn EntryListener<K, V>>,
    ) -> DataResult<ListenerId> {
        self.subscribe()?;
        let native = self.entry_listeners.add(self.client.address(), listener);
        Ok(self.tokens.insert(native))
    }

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId> {
        self.subscribe()?;
        let native = self.change_listeners.add(self.client.address(), listener);
        Ok(self.tokens.insert(native))
    }

    fn remove_listener(&self, id: &ListenerId) {
        match self.tokens.take(id) {
            Some(native) => {
                if !(self.entry_listeners.remove(native) || self.change_listeners.remove(native)) {
                    tracing::debug!(map = %self.name, %id, "listener already released");
                }
            }
            None => tracing::warn!(map = %self.name, %id, "unknown listener id"),
        }
    }
}
