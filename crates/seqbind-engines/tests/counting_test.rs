//! Counting engine operations and persistence.

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::SeqbindConfig;
use seqbind_core::errors::SeqbindErrorCode;
use seqbind_core::stream::StreamingParser;
use seqbind_engines::{CountingEngine, PresenceEngine, PresenceOps};

#[test]
fn test_count_and_get() {
    let mut engine = CountingEngine::new(4, &[1009, 1013]).unwrap();
    assert_eq!(engine.consume("ACGTACGT"), 5);
    assert_eq!(engine.get("ACGT").unwrap(), 2);
    // CGTA and TACG are reverse complements of each other.
    assert_eq!(engine.get("CGTA").unwrap(), 2);
    engine.count("GGGG").unwrap();
    assert_eq!(engine.get("CCCC").unwrap(), 1);
    assert_eq!(engine.get("AAAA").unwrap(), 0);
    assert!(engine.get("ACG").is_err());
}

#[test]
fn test_counts_saturate_without_bigcount() {
    let mut engine = CountingEngine::new(4, &[1009]).unwrap();
    for _ in 0..300 {
        engine.count("AAAA").unwrap();
    }
    assert_eq!(engine.get("AAAA").unwrap(), 255);
    assert!(!engine.get_use_bigcount());
}

#[test]
fn test_bigcount_extends_range() {
    let mut engine = CountingEngine::new(4, &[1009]).unwrap();
    engine.set_use_bigcount(true);
    for _ in 0..300 {
        engine.count("AAAA").unwrap();
    }
    assert_eq!(engine.get("AAAA").unwrap(), 300);
}

#[test]
fn test_min_max_median() {
    let mut engine = CountingEngine::new(4, &[1009, 1013]).unwrap();
    engine.consume("AAAAC");
    engine.consume("AAAA");
    engine.consume("AAAA");
    // AAAA: 3, AAAC: 1
    assert_eq!(engine.get_min_count("AAAAC").unwrap(), 1);
    assert_eq!(engine.get_max_count("AAAAC").unwrap(), 3);
    let median = engine.get_median_count("AAAAC").unwrap();
    assert_eq!(median.median, 3);
    assert!((median.average - 2.0).abs() < 1e-9);
    assert!(engine.get_median_count("AC").is_err());
}

#[test]
fn test_trim_on_abundance() {
    let mut engine = CountingEngine::new(4, &[1009, 1013]).unwrap();
    engine.consume("ACGTTGCA");
    engine.consume("ACGTTGCA");

    let (trimmed, at) = engine.trim_on_abundance("ACGTTGCACCCC", 2);
    assert_eq!(at, 8);
    assert_eq!(trimmed, "ACGTTGCA");

    let (whole, at) = engine.trim_on_abundance("ACGTTGCA", 2);
    assert_eq!((whole.as_str(), at), ("ACGTTGCA", 8));

    let (empty, at) = engine.trim_on_abundance("TTTTTTTT", 1);
    assert_eq!((empty.as_str(), at), ("", 0));
}

#[test]
fn test_abundance_distribution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reads.fa");
    std::fs::write(&path, ">a\nAAAAC\n>b\nAAAA\n").unwrap();

    let mut engine = CountingEngine::new(4, &[1009, 1013]).unwrap();
    engine.consume("AAAAC");
    engine.consume("AAAA");

    let mut tracking = PresenceEngine::new(4, &[1009]).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let hist = engine
        .abundance_distribution(&mut parser, &mut tracking, &CancellationBridge::detached())
        .unwrap();

    assert_eq!(hist.len(), 256);
    assert_eq!(hist[1], 1); // AAAC
    assert_eq!(hist[2], 1); // AAAA, counted once
    assert_eq!(hist.iter().sum::<u64>(), 2);

    let mut wrong = PresenceEngine::new(5, &[1009]).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine
        .abundance_distribution(&mut parser, &mut wrong, &CancellationBridge::detached())
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_ARGUMENT");
}

#[test]
fn test_save_load_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.ct");

    let mut engine = CountingEngine::new(5, &[1009, 1013]).unwrap();
    engine.consume("ACGTACGTAC");
    engine.save(&path).unwrap();

    let mut loaded = CountingEngine::new(5, &[7]).unwrap();
    loaded.load(&path).unwrap();
    assert_eq!(loaded.hashsizes(), vec![1009, 1013]);
    assert_eq!(loaded.get("ACGTA").unwrap(), engine.get("ACGTA").unwrap());
    assert_eq!(loaded.n_unique_kmers(), engine.n_unique_kmers());

    let mut other_k = CountingEngine::new(6, &[7]).unwrap();
    assert_eq!(other_k.load(&path).unwrap_err().error_code(), "FILE_ERROR");

    // A presence table file is not a counting table file.
    let presence_path = dir.path().join("presence.pt");
    PresenceEngine::new(5, &[1009])
        .unwrap()
        .save(&presence_path)
        .unwrap();
    assert!(loaded.load(&presence_path).is_err());
}

#[test]
fn test_from_config_defaults() {
    let config =
        SeqbindConfig::from_toml("[tables]\nksize = 12\nn_tables = 2\ntable_size = 10007\n")
            .unwrap();
    let engine = CountingEngine::from_config(&config).unwrap();
    assert_eq!(engine.ksize(), 12);
    assert_eq!(engine.hashsizes(), vec![10007, 10005]);
}

#[test]
fn test_invalid_construction() {
    assert!(CountingEngine::new(0, &[101]).is_err());
    assert!(CountingEngine::new(33, &[101]).is_err());
    assert!(CountingEngine::new(4, &[]).is_err());
    assert!(CountingEngine::new(4, &[0]).is_err());
}

#[test]
fn test_filter_if_present_writes_novel_reads() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.fa");
    let output = dir.path().join("out.fa");
    std::fs::write(&input, ">known\nACGTACGTAC\n>novel\nTTTTTTTTTT\n").unwrap();

    let mut engine = PresenceEngine::new(5, &[1009, 1013]).unwrap();
    engine.consume("ACGTACGTAC");

    let mut parser = StreamingParser::open(&input).unwrap();
    let stats = engine
        .filter_if_present(&mut parser, &output, &CancellationBridge::detached())
        .unwrap();
    assert_eq!(stats.records, 2);
    assert_eq!(stats.units, 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), ">novel\nTTTTTTTTTT\n");
}
