use super::*;
use crate::contract;
use proptest::prelude::*;

fn provider() -> LocalDataProvider {
    LocalDataProvider::new("local-test", LockConfig::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn queue_is_fifo(items in proptest::collection::vec(any::<i32>(), 0..40)) {
        contract::fifo_order(&provider(), items);
    }
}

#[test]
fn empty_queue_does_not_block() {
    contract::empty_queue_does_not_block(&provider());
}

#[test]
fn add_all_remove_all_events() {
    contract::add_all_remove_all_events(&provider());
}

#[test]
fn removed_listener_stops_callbacks() {
    contract::removed_listener_stops_callbacks(&provider());
}

#[test]
fn map_entry_events() {
    contract::map_entry_events(&provider());
}

#[test]
fn map_get_all_returns_requested_subset() {
    contract::map_get_all_returns_requested_subset(&provider());
}

#[test]
fn topic_delivers_once_per_listener() {
    contract::topic_delivers_once_per_listener(&provider());
}

#[test]
fn set_operations() {
    contract::set_operations(&provider());
}

#[test]
fn priority_queue_orders_by_ord() {
    contract::priority_queue_orders_by_ord(&provider());
}

#[test]
fn name_reuse_with_other_type_fails() {
    contract::name_reuse_with_other_type_fails(&provider());
}

#[test]
fn clones_share_state() {
    let provider = provider();
    contract::handles_share_state_by_name(&provider, &provider.clone());
}

#[test]
fn lock_excludes_other_threads() {
    contract::lock_excludes_other_threads(&provider());
}

#[test]
fn shutdown_fails_fast() {
    contract::shutdown_fails_fast(&provider());
}

#[test]
fn single_member_is_the_whole_cluster() {
    let provider = provider();
    assert_eq!(provider.local_member_address().unwrap(), "local-test");
    assert_eq!(
        provider.cluster_member_addresses().unwrap(),
        HashSet::from(["local-test".to_string()])
    );
    assert!(!provider.no_data_member_in_cluster_available());
}
