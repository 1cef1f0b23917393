//! Opaque handle kind checks, destroy-once semantics and registry ids.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use seqbind_core::errors::HandleError;
use seqbind_core::handle::{
    EngineHandle, HandleId, HandleKind, HandlePayload, HandleRegistry, OpaqueHandle,
};

struct Seed {
    key: u64,
    drops: Arc<AtomicUsize>,
}

impl HandlePayload for Seed {
    const KIND: HandleKind = HandleKind::PrePartitionInfo;

    fn release(self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

struct Subset {
    partitions: Vec<u32>,
}

impl HandlePayload for Subset {
    const KIND: HandleKind = HandleKind::SubsetPartition;
}

fn seed(key: u64) -> (OpaqueHandle, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let handle = OpaqueHandle::new(Seed {
        key,
        drops: drops.clone(),
    });
    (handle, drops)
}

#[test]
fn test_kind_checked_before_use() {
    let (handle, _) = seed(7);
    assert_eq!(handle.kind(), HandleKind::PrePartitionInfo);
    assert_eq!(handle.get::<Seed>().unwrap().key, 7);

    match handle.get::<Subset>() {
        Err(HandleError::KindMismatch { expected, found }) => {
            assert_eq!(expected, "subset_partition");
            assert_eq!(found, "pre_partition_info");
        }
        other => panic!("expected kind mismatch, got {:?}", other.map(|s| s.partitions.len())),
    }
}

#[test]
fn test_destructor_runs_exactly_once() {
    let (mut handle, drops) = seed(1);
    handle.destroy().unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    assert!(matches!(handle.destroy(), Err(HandleError::Destroyed { .. })));
    assert!(matches!(handle.get::<Seed>(), Err(HandleError::Destroyed { .. })));
    drop(handle);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_runs_pending_destructor() {
    let (handle, drops) = seed(1);
    drop(handle);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_mut_mutates_payload() {
    let mut handle = OpaqueHandle::new(Subset { partitions: vec![] });
    handle.get_mut::<Subset>().unwrap().partitions.push(3);
    assert_eq!(handle.get::<Subset>().unwrap().partitions, vec![3]);
}

#[test]
fn test_registry_ids_are_not_reused() {
    let mut registry = HandleRegistry::new();
    let (handle, drops) = seed(11);
    let id = registry.insert(handle);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.kind(id).unwrap(), HandleKind::PrePartitionInfo);

    registry.destroy(id).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());

    // Same slot, new generation.
    let id2 = registry.insert(OpaqueHandle::new(Subset { partitions: vec![1] }));
    assert_ne!(id, id2);
    assert!(matches!(registry.get(id), Err(HandleError::Stale { .. })));
    assert!(matches!(registry.destroy(id), Err(HandleError::Stale { .. })));
    assert_eq!(registry.kind(id2).unwrap(), HandleKind::SubsetPartition);
}

#[test]
fn test_registry_id_packing() {
    let mut registry = HandleRegistry::new();
    let a = registry.insert(OpaqueHandle::new(Subset { partitions: vec![] }));
    let b = registry.insert(OpaqueHandle::new(Subset { partitions: vec![] }));
    assert_eq!(HandleId::from_u64(a.as_u64()), a);
    assert_eq!(HandleId::from_u64(b.as_u64()), b);
    assert!(registry.get(HandleId::from_u64(99)).is_err());
}

#[test]
fn test_registry_remove_keeps_payload_alive() {
    let mut registry = HandleRegistry::new();
    let (handle, drops) = seed(5);
    let id = registry.insert(handle);
    let handle = registry.remove(id).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(handle.get::<Seed>().unwrap().key, 5);
}

#[test]
fn test_engine_handle_release_once() {
    let mut handle = EngineHandle::new("counting", vec![1u8, 2, 3]);
    assert_eq!(handle.get().unwrap().len(), 3);
    handle.get_mut().unwrap().push(4);

    handle.release().unwrap();
    assert!(handle.is_released());
    assert!(matches!(handle.get(), Err(HandleError::Destroyed { kind: "counting" })));
    assert!(matches!(handle.release(), Err(HandleError::Destroyed { .. })));
}
