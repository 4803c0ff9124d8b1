use super::*;

#[test]
fn same_name_and_type_share_one_store() {
    let registry = Registry::new();
    let a = registry
        .get_or_create(StoreKind::Queue, "q", "i32", || MemoryQueue::<i32>::fifo("q"))
        .unwrap();
    let b = registry
        .get_or_create(StoreKind::Queue, "q", "i32", || MemoryQueue::<i32>::fifo("q"))
        .unwrap();

    a.add(1);
    assert_eq!(b.poll(), Some(1));
}

#[test]
fn same_name_with_other_type_is_rejected() {
    let registry = Registry::new();
    registry
        .get_or_create(StoreKind::Map, "m", "String", || {
            MemoryMap::<String, String>::new("m", Default::default())
        })
        .unwrap();

    let err = registry
        .get_or_create(StoreKind::Map, "m", "u64", || {
            MemoryMap::<String, u64>::new("m", Default::default())
        })
        .err()
        .unwrap();
    assert!(matches!(err, DataError::TypeMismatch { name } if name == "m"));
}

#[test]
fn kinds_have_separate_namespaces() {
    let registry = Registry::new();
    registry
        .get_or_create(StoreKind::Queue, "shared", "i32", || MemoryQueue::<i32>::fifo("shared"))
        .unwrap();
    assert!(registry
        .get_or_create(StoreKind::Set, "shared", "String", || MemorySet::<String>::new("shared"))
        .is_ok());
}

#[test]
fn discard_all_forgets_data() {
    let registry = Registry::new();
    let set = registry
        .get_or_create(StoreKind::Set, "s", "i32", || MemorySet::<i32>::new("s"))
        .unwrap();
    set.add_all(vec![1, 2]);

    registry.discard_all();

    assert!(set.read(|s| s.is_empty()));
}
