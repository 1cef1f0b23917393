//! Tag partitioning, opaque handle flows and partition persistence.

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::errors::{EngineError, HandleError, SeqbindErrorCode};
use seqbind_core::handle::{HandleKind, OpaqueHandle};
use seqbind_core::stream::StreamingParser;
use seqbind_engines::graph::PartitionOutput;
use seqbind_engines::kmer::{forward_hash, reverse_hash};
use seqbind_engines::{
    partition_in_shards, PartitionFlags, PresenceEngine, PresenceOps, SubsetPartition,
};

const K: u32 = 15;

fn random_seq(seed: u64, len: usize) -> String {
    let mut x = seed;
    (0..len)
        .map(|_| {
            x = x
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[((x >> 33) % 4) as usize] as char
        })
        .collect()
}

/// Engine holding two unrelated 300bp sequences.
fn two_components() -> (PresenceEngine, String, String) {
    let a = random_seq(17, 300);
    let b = random_seq(4242, 300);
    let mut engine = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    engine.set_tag_density(40);
    engine.consume_and_tag(&a);
    engine.consume_and_tag(&b);
    (engine, a, b)
}

fn tags_of(engine: &PresenceEngine, seq: &str) -> Vec<u64> {
    (0..=seq.len() - K as usize)
        .map(|i| forward_hash(&seq[i..i + K as usize], K).unwrap())
        .filter(|&h| engine.graph().tags().contains(h))
        .collect()
}

#[test]
fn test_subset_partition_separates_components() {
    let (mut engine, a, b) = two_components();
    assert!(engine.n_tags() >= 4);

    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    assert_eq!(handle.kind(), HandleKind::SubsetPartition);
    engine.merge_subset(&handle).unwrap();

    assert_eq!(engine.count_partitions(), (2, 0));

    let pid_a = engine.get_partition_id(&a[..K as usize]).unwrap();
    let pid_b = engine.get_partition_id(&b[..K as usize]).unwrap();
    assert_ne!(pid_a, 0);
    assert_ne!(pid_b, 0);
    assert_ne!(pid_a, pid_b);

    for tag in tags_of(&engine, &a) {
        let kmer = reverse_hash(tag, K).unwrap();
        assert_eq!(engine.get_partition_id(&kmer).unwrap(), pid_a);
    }
}

#[test]
fn test_subset_save_load_round_trip() {
    let (engine, a, b) = two_components();
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    let subset = handle.get::<SubsetPartition>().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.subset");
    subset.save(&path).unwrap();
    let loaded = SubsetPartition::load(&path).unwrap();

    assert_eq!(loaded.range(), subset.range());
    assert_eq!(loaded.count_partitions(), subset.count_partitions());
    for tag in tags_of(&engine, &a).into_iter().chain(tags_of(&engine, &b)) {
        assert_eq!(loaded.partition_id(tag), subset.partition_id(tag));
    }
}

#[test]
fn test_merge_subset_from_disk() {
    let (mut engine, a, _) = two_components();
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.subset");
    handle.get::<SubsetPartition>().unwrap().save(&path).unwrap();
    drop(handle);

    engine.merge_subset_from_disk(&path).unwrap();
    assert_eq!(engine.count_partitions().0, 2);
    assert_ne!(engine.get_partition_id(&a[..K as usize]).unwrap(), 0);
}

#[test]
fn test_load_missing_or_wrong_file_is_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SubsetPartition::load(&dir.path().join("nope")).unwrap_err();
    assert_eq!(err.error_code(), "FILE_ERROR");

    let (engine, _, _) = two_components();
    let tagset = dir.path().join("tags.json");
    engine.save_tagset(&tagset).unwrap();
    let err = SubsetPartition::load(&tagset).unwrap_err();
    assert!(matches!(err, EngineError::File { .. }));
}

#[test]
fn test_find_all_tags_then_assign() {
    let (mut engine, a, _) = two_components();
    let info = engine.find_all_tags(&a[100..100 + K as usize]).unwrap();
    assert_eq!(info.kind(), HandleKind::PrePartitionInfo);

    let pid = engine.assign_partition_id(&info).unwrap();
    assert_ne!(pid, 0);
    assert_eq!(engine.count_partitions().0, 1);
}

#[test]
fn test_handle_kind_checked_by_consumers() {
    let (mut engine, a, _) = two_components();
    let info = engine.find_all_tags(&a[..K as usize]).unwrap();

    let err = engine.merge_subset(&info).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_HANDLE");
    assert!(matches!(
        err,
        EngineError::Handle(HandleError::KindMismatch { .. })
    ));

    let subset = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    assert!(engine.assign_partition_id(&subset).is_err());
}

#[test]
fn test_destroyed_handle_rejected() {
    let (mut engine, _, _) = two_components();
    let mut subset: OpaqueHandle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    subset.destroy().unwrap();
    let err = engine.merge_subset(&subset).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Handle(HandleError::Destroyed { .. })
    ));
}

#[test]
fn test_sharded_partition_matches_single_pass() {
    let (mut engine, a, b) = two_components();
    let handles = partition_in_shards(
        &engine,
        3,
        PartitionFlags::default(),
        &CancellationBridge::detached(),
    )
    .unwrap();
    assert_eq!(handles.len(), 3);
    for handle in &handles {
        engine.merge_subset(handle).unwrap();
    }

    assert_eq!(engine.count_partitions(), (2, 0));
    assert_ne!(
        engine.get_partition_id(&a[..K as usize]).unwrap(),
        engine.get_partition_id(&b[..K as usize]).unwrap()
    );
}

#[test]
fn test_join_partitions_and_partitionmap_persistence() {
    let (mut engine, a, b) = two_components();
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    engine.merge_subset(&handle).unwrap();

    let pid_a = engine.get_partition_id(&a[..K as usize]).unwrap();
    let pid_b = engine.get_partition_id(&b[..K as usize]).unwrap();
    let joined = engine.join_partitions(pid_a, pid_b);
    assert_eq!(engine.count_partitions().0, 1);
    assert_eq!(engine.get_partition_id(&b[..K as usize]).unwrap(), joined);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.pmap");
    engine.save_partitionmap(&path).unwrap();

    let mut fresh = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    fresh.load_partitionmap(&path).unwrap();
    assert_eq!(fresh.get_partition_id(&a[..K as usize]).unwrap(), joined);
}

#[test]
fn test_stop_tags_block_traversal() {
    let seq = random_seq(99, 200);
    let mut engine = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    engine.set_tag_density(1000);
    engine.consume_and_tag(&seq);
    // Density larger than the read: only the first and last k-mers are tags.
    assert_eq!(engine.n_tags(), 2);

    engine.add_stop_tag(&seq[100..100 + K as usize]).unwrap();
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    engine.merge_subset(&handle).unwrap();
    assert_eq!(engine.count_partitions(), (2, 0));
    assert_eq!(engine.get_stop_tags().unwrap().len(), 1);
}

#[test]
fn test_partitioned_output_round_trip() {
    let (mut engine, a, b) = two_components();
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    engine.merge_subset(&handle).unwrap();
    let pid_a = engine.get_partition_id(&a[..K as usize]).unwrap();
    let pid_b = engine.get_partition_id(&b[..K as usize]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let reads = dir.path().join("reads.fa");
    let stray = random_seq(777, 120);
    std::fs::write(&reads, format!(">a first\n{a}\n>b\n{b}\n>c\n{stray}\n")).unwrap();

    let out = dir.path().join("reads.part");
    let mut parser = StreamingParser::open(&reads).unwrap();
    let written = engine
        .output_partitions(&mut parser, &out, false, &CancellationBridge::detached())
        .unwrap();
    assert_eq!(
        written,
        PartitionOutput {
            records: 3,
            written: 2,
            partitions: 2
        }
    );

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains(&format!(">a first\t{pid_a}\n")));
    assert!(text.contains(&format!(">b\t{pid_b}\n")));

    let mut with_unassigned = StreamingParser::open(&reads).unwrap();
    let all = engine
        .output_partitions(&mut with_unassigned, &out, true, &CancellationBridge::detached())
        .unwrap();
    assert_eq!(all.written, 3);
    assert!(std::fs::read_to_string(&out).unwrap().contains(">c\t0\n"));

    let mut restored = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    let mut parser = StreamingParser::open(&out).unwrap();
    let stats = restored
        .consume_partitioned_file(&mut parser, &CancellationBridge::detached())
        .unwrap();
    assert_eq!(stats.records, 3);
    assert_eq!(restored.n_tags(), 3);
    assert_eq!(restored.count_partitions(), (2, 1));
    assert_eq!(restored.get_partition_id(&a[..K as usize]).unwrap(), pid_a);
    assert_eq!(restored.get_partition_id(&b[..K as usize]).unwrap(), pid_b);
    assert_eq!(restored.get_partition_id(&stray[..K as usize]).unwrap(), 0);
}

#[test]
fn test_partitioned_file_requires_partition_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.fa");
    std::fs::write(&path, format!(">r1\n{}\n", random_seq(3, 60))).unwrap();

    let mut engine = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine
        .consume_partitioned_file(&mut parser, &CancellationBridge::detached())
        .unwrap_err();
    assert_eq!(err.error_code(), "STREAM_READ_ERROR");
}

#[test]
fn test_stop_tags_trim_and_skip_consumption() {
    let seq = random_seq(99, 200);
    let mut engine = PresenceEngine::new(K, &[200_003, 200_017]).unwrap();
    let stop = &seq[100..100 + K as usize];
    engine.add_stop_tag(stop).unwrap();

    let (trimmed, len) = engine.trim_on_stoptags(&seq);
    assert_eq!(len, 100 + K as usize - 1);
    assert_eq!(trimmed, &seq[..len]);
    assert_eq!(engine.trim_on_stoptags(&seq[..100]), (seq[..100].to_string(), 100));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.fa");
    std::fs::write(&path, format!(">r\n{seq}\n")).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let stats = engine
        .consume_file_and_tag_with_stoptags(&mut parser, &CancellationBridge::detached())
        .unwrap();

    assert_eq!(stats.units, (seq.len() - K as usize + 1 - 1) as u64);
    assert_eq!(engine.get(stop).unwrap(), 0);
    let tagged = |at: usize| {
        let hash = forward_hash(&seq[at..at + K as usize], K).unwrap();
        engine.graph().tags().contains(hash)
    };
    assert!(!tagged(100));
    // Both runs around the stop tag end in a tag.
    assert!(tagged(99));
    assert!(tagged(101));
}
