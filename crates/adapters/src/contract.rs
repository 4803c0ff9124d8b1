// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behaviour every provider must share, run against each backend's tests

use crate::testing::Recorder;
use bq_core::{DataError, DistributedDataProvider, ListenerId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn fifo_order<P: DistributedDataProvider>(provider: &P, items: Vec<i32>) {
    let queue = provider.get_queue::<i32>("contract-fifo").unwrap();
    queue.clear().unwrap();
    for item in &items {
        assert!(queue.add(*item).unwrap());
    }
    assert_eq!(queue.get_all().unwrap(), items);

    let mut polled = Vec::new();
    while let Some(item) = queue.poll().unwrap() {
        polled.push(item);
    }
    assert_eq!(polled, items);
}

pub fn empty_queue_does_not_block<P: DistributedDataProvider>(provider: &P) {
    let queue = provider.get_queue::<String>("contract-empty").unwrap();
    let start = std::time::Instant::now();
    assert_eq!(queue.poll().unwrap(), None);
    assert_eq!(queue.peek().unwrap(), None);
    assert!(queue.is_empty().unwrap());
    assert!(start.elapsed() < std::time::Duration::from_secs(1));
}

pub fn add_all_remove_all_events<P: DistributedDataProvider>(provider: &P) {
    let queue = provider.get_queue::<String>("contract-bulk").unwrap();
    let recorder = Recorder::new();
    queue.add_item_listener(recorder.clone()).unwrap();

    let items: Vec<String> = ["a", "b", "c", "d"].map(String::from).to_vec();
    assert!(queue.add_all(items).unwrap());
    assert!(queue
        .remove_all(&["b".to_string(), "d".to_string()])
        .unwrap());

    assert_eq!(queue.get_all().unwrap(), vec!["a", "c"]);
    assert_eq!(
        recorder.wait_for(6),
        vec![
            r#"added "a""#,
            r#"added "b""#,
            r#"added "c""#,
            r#"added "d""#,
            r#"removed "b""#,
            r#"removed "d""#,
        ]
    );
    recorder.assert_quiet();
}

struct Counter(AtomicUsize);

impl bq_core::ChangeListener for Counter {
    fn changed(&self, _event: bq_core::ChangeEvent) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn removed_listener_stops_callbacks<P: DistributedDataProvider>(provider: &P) {
    let queue = provider.get_queue::<u32>("contract-remove-listener").unwrap();
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let marker = Recorder::new();
    let id = queue.add_listener(counter.clone()).unwrap();
    queue.add_item_listener(marker.clone()).unwrap();

    queue.add(1).unwrap();
    marker.wait_for(1);
    queue.remove_listener(&id);
    queue.remove_listener(&id);
    queue.remove_listener(&ListenerId::new());

    queue.add(2).unwrap();
    queue.poll().unwrap();
    marker.wait_for(2);

    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

pub fn map_entry_events<P: DistributedDataProvider>(provider: &P) {
    let map = provider.get_map::<String, String>("contract-map-events").unwrap();
    let recorder = Recorder::new();
    map.add_entry_listener(recorder.clone()).unwrap();

    assert_eq!(map.put("key1".into(), "value1".into()).unwrap(), None);
    assert_eq!(
        map.put("key1".into(), "value2".into()).unwrap(),
        Some("value1".to_string())
    );
    assert_eq!(
        map.remove(&"key1".to_string()).unwrap(),
        Some("value2".to_string())
    );

    assert_eq!(
        recorder.wait_for(3),
        vec![
            r#"added "key1"=Some("value1")"#,
            r#"updated "key1"=Some("value2") was Some("value1")"#,
            r#"removed "key1" was Some("value2")"#,
        ]
    );
}

pub fn map_get_all_returns_requested_subset<P: DistributedDataProvider>(provider: &P) {
    let map = provider.get_map::<String, u32>("contract-map-get-all").unwrap();
    for (k, v) in [("key1", 1), ("key2", 2), ("key3", 3)] {
        map.put(k.to_string(), v).unwrap();
    }

    let keys: HashSet<String> = ["key1", "key3", "missing"].map(String::from).into();
    let found = map.get_all(&keys).unwrap();

    assert_eq!(
        found,
        HashMap::from([("key1".to_string(), 1), ("key3".to_string(), 3)])
    );
    assert_eq!(map.size().unwrap(), 3);
    assert_eq!(map.key_set().unwrap().len(), 3);
    assert_eq!(map.map_copy().unwrap().get("key2"), Some(&2));
}

pub fn topic_delivers_once_per_listener<P: DistributedDataProvider>(provider: &P) {
    let topic = provider.get_topic::<String>("contract-topic").unwrap();
    let first = Recorder::new();
    let second = Recorder::new();
    topic.add_message_listener(first.clone()).unwrap();
    let second_id = topic.add_message_listener(second.clone()).unwrap();

    topic.publish("Hello, World!".to_string()).unwrap();

    assert_eq!(first.wait_for(1), vec![r#"message "Hello, World!""#]);
    assert_eq!(second.wait_for(1), vec![r#"message "Hello, World!""#]);
    first.assert_quiet();
    second.assert_quiet();

    topic.remove_message_listener(&second_id);
    topic.publish("again".to_string()).unwrap();
    first.wait_for(1);
    second.assert_quiet();
}

pub fn set_operations<P: DistributedDataProvider>(provider: &P) {
    let set = provider.get_set::<String>("contract-set").unwrap();
    let recorder = Recorder::new();
    set.add_item_listener(recorder.clone()).unwrap();

    assert!(set.add("a".to_string()).unwrap());
    assert!(!set.add("a".to_string()).unwrap());
    assert!(set.add_all(vec!["b".to_string(), "c".to_string()]).unwrap());
    assert!(set
        .contains_all(&["a".to_string(), "c".to_string()])
        .unwrap());
    assert!(!set.contains(&"z".to_string()).unwrap());
    assert!(set.remove(&"b".to_string()).unwrap());
    assert_eq!(set.size().unwrap(), 2);
    assert_eq!(
        set.set_copy().unwrap(),
        HashSet::from(["a".to_string(), "c".to_string()])
    );

    let events = recorder.wait_for(4);
    assert_eq!(events[0], r#"added "a""#);
    assert_eq!(events[3], r#"removed "b""#);
}

pub fn priority_queue_orders_by_ord<P: DistributedDataProvider>(provider: &P) {
    let queue = provider
        .get_priority_queue::<(u8, String)>("contract-priority")
        .unwrap();
    queue.add((2, "normal".into())).unwrap();
    queue.add((1, "urgent".into())).unwrap();
    queue.add((3, "low".into())).unwrap();

    let order: Vec<_> = std::iter::from_fn(|| queue.poll().unwrap())
        .map(|(_, name)| name)
        .collect();
    assert_eq!(order, vec!["urgent", "normal", "low"]);
}

pub fn name_reuse_with_other_type_fails<P: DistributedDataProvider>(provider: &P) {
    provider.get_map::<String, u32>("contract-typed").unwrap();
    let err = provider
        .get_map::<String, String>("contract-typed")
        .err()
        .unwrap();
    assert!(matches!(err, DataError::TypeMismatch { .. }));
}

pub fn handles_share_state_by_name<P: DistributedDataProvider>(a: &P, b: &P) {
    let producer = a.get_queue::<String>("contract-shared").unwrap();
    let consumer = b.get_queue::<String>("contract-shared").unwrap();
    producer.add("job".into()).unwrap();
    assert_eq!(consumer.poll().unwrap(), Some("job".to_string()));
}

pub fn lock_excludes_other_threads<P: DistributedDataProvider>(provider: &P) {
    let map = provider.get_map::<String, u32>("contract-lock").unwrap();
    map.put("counter".into(), 0).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let key = "counter".to_string();
                    let _guard = bq_core::KeyGuard::acquire(map.as_ref(), key.clone()).unwrap();
                    let value = map.get(&key).unwrap().unwrap_or(0);
                    map.put(key, value + 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.get(&"counter".to_string()).unwrap(), Some(100));
}

pub fn shutdown_fails_fast<P: DistributedDataProvider>(provider: &P) {
    let queue = provider.get_queue::<u32>("contract-shutdown").unwrap();
    assert!(provider.is_instance_running());
    assert!(provider.local_member_address().is_ok());

    provider.shutdown();

    assert!(!provider.is_instance_running());
    assert!(provider.no_data_member_in_cluster_available());
    assert!(matches!(
        provider.local_member_address(),
        Err(DataError::BackendNotActive { .. })
    ));
    assert!(queue.add(1).unwrap_err().is_retryable());
    queue.remove_listener(&ListenerId::new());
}
