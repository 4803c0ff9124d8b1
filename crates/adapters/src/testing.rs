// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording listeners for adapter tests
#![cfg_attr(coverage_nightly, coverage(off))]

use bq_core::{
    ChangeEvent, ChangeListener, EntryEvent, EntryListener, ItemEvent, ItemListener, Message,
    MessageListener,
};
use std::fmt::Debug;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

/// Records every callback as a line of text
pub struct Recorder {
    tx: Mutex<Sender<String>>,
    rx: Mutex<Receiver<String>>,
}

impl Recorder {
    pub fn new() -> std::sync::Arc<Self> {
        let (tx, rx) = channel();
        std::sync::Arc::new(Self {
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        })
    }

    fn record(&self, line: String) {
        let _ = self.tx.lock().unwrap_or_else(|e| e.into_inner()).send(line);
    }

    /// Wait for exactly `n` events
    pub fn wait_for(&self, n: usize) -> Vec<String> {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
        let lines: Vec<String> = (0..n)
            .map_while(|_| rx.recv_timeout(Duration::from_secs(5)).ok())
            .collect();
        assert_eq!(lines.len(), n, "timed out waiting for events, got {lines:?}");
        lines
    }

    /// Assert nothing else arrives within a short window
    pub fn assert_quiet(&self) {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
        let extra = rx.recv_timeout(Duration::from_millis(150)).ok();
        assert_eq!(extra, None, "unexpected event");
    }
}

impl<T: Debug> ItemListener<T> for Recorder {
    fn item_added(&self, event: ItemEvent<T>) {
        self.record(format!("added {:?}", event.item));
    }

    fn item_removed(&self, event: ItemEvent<T>) {
        self.record(format!("removed {:?}", event.item));
    }
}

impl<K: Debug, V: Debug> EntryListener<K, V> for Recorder {
    fn entry_added(&self, event: EntryEvent<K, V>) {
        self.record(format!("added {:?}={:?}", event.key, event.value));
    }

    fn entry_updated(&self, event: EntryEvent<K, V>) {
        self.record(format!(
            "updated {:?}={:?} was {:?}",
            event.key, event.value, event.old_value
        ));
    }

    fn entry_removed(&self, event: EntryEvent<K, V>) {
        self.record(format!("removed {:?} was {:?}", event.key, event.old_value));
    }
}

impl ChangeListener for Recorder {
    fn changed(&self, event: ChangeEvent) {
        self.record(format!("{:?}", event.kind));
    }
}

impl<T: Debug> MessageListener<T> for Recorder {
    fn on_message(&self, message: Message<T>) {
        self.record(format!("message {:?}", message.payload));
    }
}
