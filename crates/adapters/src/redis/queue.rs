// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{
    decode, encode, ensure_subscribed, ItemEnvelope, EventKind, RedisClient, Shared,
    Subscription,
};
use crate::dispatch::Listeners;
use crate::store::TokenTable;
use bq_core::{
    ChangeEvent, ChangeListener, DataResult, DistributedQueue, ItemChange, ItemListener,
    ListenerId, Payload,
};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Queue stored as a Redis list
///
/// Priority queues insert before the first greater element while holding an
/// insert lock; polls never take the lock.
pub struct RedisQueue<T> {
    client: Arc<RedisClient>,
    name: String,
    key: String,
    channel: String,
    order: Option<fn(&T, &T) -> Ordering>,
    item_listeners: Shared<dyn ItemListener<T>>,
    change_listeners: Shared<dyn ChangeListener>,
    subscription: Mutex<Option<Subscription>>,
    tokens: TokenTable,
}

impl<T: Payload> RedisQueue<T> {
    pub fn fifo(client: Arc<RedisClient>, name: &str) -> Self {
        Self::build(client, name, None)
    }

    pub fn ordered(client: Arc<RedisClient>, name: &str) -> Self
    where
        T: Ord,
    {
        Self::build(client, name, Some(T::cmp))
    }

    fn build(client: Arc<RedisClient>, name: &str, order: Option<fn(&T, &T) -> Ordering>) -> Self {
        Self {
            key: client.key("queue", name),
            channel: client.channel("queue", name),
            client,
            name: name.to_string(),
            order,
            item_listeners: Arc::new(Listeners::new()),
            change_listeners: Arc::new(Listeners::new()),
            subscription: Mutex::new(None),
            tokens: TokenTable::default(),
        }
    }

    fn encode_all(&self, items: &[T]) -> DataResult<Vec<String>> {
        items.iter().map(|item| encode(&self.name, item)).collect()
    }

    fn push(&self, encoded: &[String]) -> DataResult<()> {
        if encoded.is_empty() {
            return Ok(());
        }
        self.client.with_conn(|con| {
            let mut invocation = self.client.scripts.queue_push.prepare_invoke();
            invocation.key(&self.key).key(&self.channel);
            for value in encoded {
                invocation.arg(value);
            }
            invocation.invoke::<i64>(con)
        })?;
        Ok(())
    }

    fn insert_ordered(&self, order: fn(&T, &T) -> Ordering, items: &[T]) -> DataResult<()> {
        let lock_key = format!("{}:insert", self.key);
        self.client.lock(&lock_key)?;
        let result = items
            .iter()
            .try_for_each(|item| self.insert_ordered_locked(order, item));
        let unlocked = self.client.unlock(&self.name, &lock_key, "insert");
        result.and(unlocked)
    }

    fn insert_ordered_locked(&self, order: fn(&T, &T) -> Ordering, item: &T) -> DataResult<()> {
        let encoded = encode(&self.name, item)?;
        loop {
            let current: Vec<String> = self
                .client
                .with_conn(|con| redis::cmd("LRANGE").arg(&self.key).arg(0).arg(-1).query(con))?;
            let pivot = current.iter().find(|existing| {
                decode::<T>(&self.name, existing)
                    .map(|e| order(&e, item) == Ordering::Greater)
                    .unwrap_or(false)
            });
            let Some(pivot) = pivot else {
                return self.push(std::slice::from_ref(&encoded));
            };
            let inserted: i64 = self.client.with_conn(|con| {
                self.client
                    .scripts
                    .queue_insert_before
                    .key(&self.key)
                    .key(&self.channel)
                    .arg(pivot)
                    .arg(&encoded)
                    .invoke(con)
            })?;
            if inserted > 0 {
                return Ok(());
            }
            // The pivot was polled in the meantime
        }
    }

    fn subscribe(&self) -> DataResult<()> {
        ensure_subscribed(&self.subscription, || {
            let items = Arc::clone(&self.item_listeners);
            let changes = Arc::clone(&self.change_listeners);
            let name = self.name.clone();
            self.client.subscribe(self.channel.clone(), move |payload| {
                let envelope = match serde_json::from_str::<ItemEnvelope<T>>(payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::error!(queue = %name, error = %e, "dropping undecodable event");
                        return;
                    }
                };
                let change = match envelope.kind {
                    EventKind::Removed => ItemChange::Removed(envelope.item),
                    EventKind::Added | EventKind::Updated => ItemChange::Added(envelope.item),
                };
                for listener in items.snapshot() {
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

impl<T: Payload> DistributedQueue<T> for RedisQueue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, item: T) -> DataResult<bool> {
        self.add_all(vec![item])
    }

    fn add_all(&self, items: Vec<T>) -> DataResult<bool> {
        match self.order {
            Some(order) => self.insert_ordered(order, &items)?,
            None => self.push(&self.encode_all(&items)?)?,
        }
        Ok(!items.is_empty())
    }

    fn poll(&self) -> DataResult<Option<T>> {
        let head: Option<String> = self.client.with_conn(|con| {
            self.client
                .scripts
                .queue_poll
                .key(&self.key)
                .key(&self.channel)
                .invoke(con)
        })?;
        head.map(|text| decode(&self.name, &text)).transpose()
    }

    fn peek(&self) -> DataResult<Option<T>> {
        let head: Option<String> = self
            .client
            .with_conn(|con| redis::cmd("LINDEX").arg(&self.key).arg(0).query(con))?;
        head.map(|text| decode(&self.name, &text)).transpose()
    }

    fn remove_all(&self, items: &[T]) -> DataResult<bool> {
        let targets = self.encode_all(items)?;
        if targets.is_empty() {
            return Ok(false);
        }
        let removed: i64 = self.client.with_conn(|con| {
            let mut invocation = self.client.scripts.queue_remove.prepare_invoke();
            invocation.key(&self.key).key(&self.channel);
            for target in &targets {
                invocation.arg(target);
            }
            invocation.invoke(con)
        })?;
        Ok(removed > 0)
    }

    fn get_all(&self) -> DataResult<Vec<T>> {
        let all: Vec<String> = self
            .client
            .with_conn(|con| redis::cmd("LRANGE").arg(&self.key).arg(0).arg(-1).query(con))?;
        all.iter().map(|text| decode(&self.name, text)).collect()
    }

    fn clear(&self) -> DataResult<()> {
        self.client.with_conn(|con| {
            self.client
                .scripts
                .queue_clear
                .key(&self.key)
                .key(&self.channel)
                .invoke::<i64>(con)
        })?;
        Ok(())
    }

    fn size(&self) -> DataResult<usize> {
        self.client
            .with_conn(|con| redis::cmd("LLEN").arg(&self.key).query(con))
    }

    fn add_item_listener(&self, listener: Arc<dyn ItemListener<T>>) -> DataResult<ListenerId> {
        self.subscribe()?;
        let native = self.item_listeners.add(self.client.address(), listener);
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
                if !(self.item_listeners.remove(native) || self.change_listeners.remove(native)) {
                    tracing::debug!(queue = %self.name, %id, "listener already released");
                }
            }
            None => tracing::warn!(queue = %self.name, %id, "unknown listener id"),
        }
    }
}
