// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::MemberScoped;
use crate::dispatch::{Dispatcher, Listeners};
use bq_core::{Message, MessageListener};
use std::sync::Arc;

pub struct MemoryTopic<T> {
    name: String,
    listeners: Listeners<dyn MessageListener<T>>,
    dispatcher: Dispatcher,
}

impl<T: Clone + Send + Sync + 'static> MemoryTopic<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            listeners: Listeners::new(),
            dispatcher: Dispatcher::spawn(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver to every listener registered at the time of the call
    pub fn publish(&self, payload: T, publisher: Option<String>) {
        let listeners = self.listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let topic = self.name.clone();
        self.dispatcher.dispatch(move || {
            for listener in &listeners {
                listener.on_message(Message {
                    topic: topic.clone(),
                    payload: payload.clone(),
                    publisher: publisher.clone(),
                });
            }
        });
    }

    pub fn add_message_listener(&self, owner: &str, listener: Arc<dyn MessageListener<T>>) -> u64 {
        self.listeners.add(owner, listener)
    }

    pub fn remove_listener(&self, id: u64) -> bool {
        self.listeners.remove(id)
    }
}

impl<T: Clone + Send + Sync + 'static> MemberScoped for MemoryTopic<T> {
    fn release_member(&self, member: &str) {
        self.listeners.remove_owner(member);
    }

    fn discard(&self) {}
}
