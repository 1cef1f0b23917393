//! Cancellation and progress reporting through file-scale operations.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::errors::{EngineError, ParseError, SeqbindErrorCode};
use seqbind_core::stream::{ParserHandle, RecordReader, StreamingParser};
use seqbind_core::traits::{
    Cancellable, CancellationToken, ObserverChoice, ObserverError, ProgressDefaults,
    ProgressObserver,
};
use seqbind_core::types::SequenceRecord;
use seqbind_engines::graph::PARTITION_REPORT_INTERVAL;
use seqbind_engines::{
    partition_in_shards, CountingEngine, HllCounter, PartitionFlags, PresenceEngine, PresenceOps,
};

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

fn write_reads(dir: &tempfile::TempDir, n: usize) -> PathBuf {
    let path = dir.path().join("reads.fa");
    let mut file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    for i in 0..n {
        writeln!(file, ">read{i}\n{}", random_seq(i as u64 + 1, 50)).unwrap();
    }
    file.flush().unwrap();
    path
}

#[test]
fn test_consume_completes_and_reports_each_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 10_000);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: Arc<dyn ProgressObserver> = Arc::new(
        move |tag: &str, records: u64, _: u64| -> Result<(), ObserverError> {
            assert_eq!(tag, "consume_file");
            sink.lock().unwrap().push(records);
            Ok(())
        },
    );
    let bridge = CancellationBridge::detached()
        .with_observer(&ObserverChoice::Explicit(observer), &ProgressDefaults::new());

    let mut engine = CountingEngine::new(12, &[100_003, 100_019])
        .unwrap()
        .with_report_interval(1000);
    let mut parser = StreamingParser::open(&path).unwrap();
    let stats = engine.consume_file(&mut parser, &bridge).unwrap();

    assert_eq!(stats.records, 10_000);
    assert_eq!(stats.units, 10_000 * (50 - 12 + 1));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10_000]
    );
}

#[test]
fn test_interrupt_mid_consume_reports_partial_progress() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 10_000);

    let token = CancellationToken::new();
    let trigger = token.clone();
    // The interrupt is raised while the 3000-record report runs, so the next
    // report point consumes it.
    let observer: Arc<dyn ProgressObserver> = Arc::new(
        move |_: &str, records: u64, _: u64| -> Result<(), ObserverError> {
            if records >= 3000 {
                trigger.cancel();
            }
            Ok(())
        },
    );
    let bridge = CancellationBridge::new(token.clone())
        .with_observer(&ObserverChoice::Explicit(observer), &ProgressDefaults::new());

    let mut engine = CountingEngine::new(12, &[100_003, 100_019])
        .unwrap()
        .with_report_interval(1000);
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine.consume_file(&mut parser, &bridge).unwrap_err();

    assert_eq!(err.error_code(), "CANCELLED");
    match err {
        EngineError::Cancelled {
            operation,
            records,
            units,
            ..
        } => {
            assert_eq!(operation, "consume_file");
            assert_eq!(records, 4000);
            assert!(records > 0 && records < 10_000);
            assert_eq!(units, 4000 * 39);
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert!(!token.is_cancelled());

    // The engine is still usable after cancellation.
    assert!(engine.n_unique_kmers() > 0);
    assert_eq!(engine.consume("ACGTACGTACGTACGT"), 5);
}

#[test]
fn test_observer_failure_cancels_presence_consume() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 2_500);

    let observer: Arc<dyn ProgressObserver> = Arc::new(
        |_: &str, _: u64, _: u64| -> Result<(), ObserverError> {
            Err(ObserverError::new("host callback raised"))
        },
    );
    let bridge = CancellationBridge::detached()
        .with_observer(&ObserverChoice::Explicit(observer), &ProgressDefaults::new());

    let mut engine = PresenceEngine::new(12, &[100_003])
        .unwrap()
        .with_report_interval(1000);
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine.consume_file_and_tag(&mut parser, &bridge).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.records_processed(), Some(1000));
    assert!(err.to_string().contains("host callback raised"));
}

#[test]
fn test_suppressed_observer_ignores_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 1_500);

    let defaults = ProgressDefaults::new();
    defaults.set(Arc::new(
        |_: &str, _: u64, _: u64| -> Result<(), ObserverError> { Err(ObserverError::new("no")) },
    ));
    let bridge =
        CancellationBridge::detached().with_observer(&ObserverChoice::Suppressed, &defaults);

    let mut hll = HllCounter::new(0.01, 12).unwrap().with_report_interval(500);
    let mut parser = StreamingParser::open(&path).unwrap();
    let stats = hll.consume_file(&mut parser, &bridge).unwrap();
    assert_eq!(stats.records, 1_500);
}

#[test]
fn test_stream_error_keeps_progress() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.fq");
    std::fs::write(&path, "@a\nACGTACGTACGT\n+\nIIIIIIIIIIII\n@b\nACGTACGTACGT\n+\nII\n").unwrap();

    let mut engine = CountingEngine::new(4, &[1009]).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine
        .consume_file(&mut parser, &CancellationBridge::detached())
        .unwrap_err();

    assert_eq!(err.error_code(), "STREAM_READ_ERROR");
    assert_eq!(err.records_processed(), Some(1));
    assert!(err.to_string().contains("1 records consumed before failure"));
}

fn failing_observer(calls: Arc<AtomicUsize>) -> ObserverChoice {
    ObserverChoice::Explicit(Arc::new(
        move |_: &str, _: u64, _: u64| -> Result<(), ObserverError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ObserverError::new("stop requested"))
        },
    ))
}

/// Presence engine where every k-mer of one long read is a tag.
fn densely_tagged(len: usize) -> PresenceEngine {
    let mut engine = PresenceEngine::new(15, &[1_000_003, 1_000_033]).unwrap();
    engine.set_tag_density(1);
    engine.consume_and_tag(&random_seq(7, len));
    engine
}

#[test]
fn test_subset_partition_cancelled_at_report_point() {
    let mut engine = densely_tagged(25_000);
    assert!(engine.n_tags() as u64 > 2 * PARTITION_REPORT_INTERVAL);

    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = CancellationBridge::detached()
        .with_observer(&failing_observer(calls.clone()), &ProgressDefaults::new());
    let err = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &bridge)
        .unwrap_err();

    match err {
        EngineError::Cancelled {
            operation,
            records,
            units,
            ..
        } => {
            assert_eq!(operation, "do_subset_partition");
            assert_eq!(records, PARTITION_REPORT_INTERVAL);
            assert!(units >= PARTITION_REPORT_INTERVAL);
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Nothing was merged; a fresh run still partitions everything.
    assert_eq!(engine.count_partitions().0, 0);
    let handle = engine
        .do_subset_partition(0, 0, PartitionFlags::default(), &CancellationBridge::detached())
        .unwrap();
    engine.merge_subset(&handle).unwrap();
    assert_eq!(engine.count_partitions().0, 1);
}

#[test]
fn test_sharded_partition_stops_every_shard() {
    let engine = densely_tagged(36_000);
    let shards = 3;
    assert!(engine.n_tags() as u64 > shards as u64 * PARTITION_REPORT_INTERVAL);

    let token = CancellationToken::new();
    token.cancel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let observer: Arc<dyn ProgressObserver> = Arc::new(
        move |_: &str, _: u64, _: u64| -> Result<(), ObserverError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );
    let bridge = CancellationBridge::new(token.clone())
        .with_observer(&ObserverChoice::Explicit(observer), &ProgressDefaults::new());

    let err = partition_in_shards(&engine, shards, PartitionFlags::default(), &bridge)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.records_processed(), Some(PARTITION_REPORT_INTERVAL));
    // The one interrupt stops all shards before any of them reports.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!token.is_cancelled());
    assert!(bridge.stopped().is_some());
}

#[test]
fn test_abundance_distribution_cancelled_keeps_tracking_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 2_500);

    let mut counts = CountingEngine::new(12, &[100_003, 100_019])
        .unwrap()
        .with_report_interval(1000);
    let mut parser = StreamingParser::open(&path).unwrap();
    counts
        .consume_file(&mut parser, &CancellationBridge::detached())
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = CancellationBridge::detached()
        .with_observer(&failing_observer(calls), &ProgressDefaults::new());
    let mut tracking = PresenceEngine::new(12, &[100_003, 100_019]).unwrap();
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = counts
        .abundance_distribution(&mut parser, &mut tracking, &bridge)
        .unwrap_err();

    match err {
        EngineError::Cancelled {
            operation,
            records,
            units,
            ..
        } => {
            assert_eq!(operation, "abundance_distribution");
            assert_eq!(records, 1000);
            assert!(units > 0 && units <= 1000 * 39);
            assert!(tracking.n_unique_kmers() > 0);
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

#[test]
fn test_filter_if_present_cancelled_leaves_whole_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reads(&dir, 3_000);

    // Long k-mers and four tables keep unrelated reads from matching.
    let sizes = [2_000_003, 2_000_029, 2_000_039, 2_000_081];
    let mut engine = PresenceEngine::new(20, &sizes)
        .unwrap()
        .with_report_interval(1000);
    for i in 0..500 {
        engine.consume(&random_seq(i + 1, 50));
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = CancellationBridge::detached()
        .with_observer(&failing_observer(calls), &ProgressDefaults::new());
    let out = dir.path().join("kept.fa");
    let mut parser = StreamingParser::open(&path).unwrap();
    let err = engine
        .filter_if_present(&mut parser, &out, &bridge)
        .unwrap_err();

    let written = match err {
        EngineError::Cancelled { records, units, .. } => {
            assert_eq!(records, 1000);
            units
        }
        other => panic!("expected Cancelled, got {other:?}"),
    };
    assert_eq!(written, 500);

    let mut kept = StreamingParser::open(&out).unwrap();
    let mut names = Vec::new();
    while let Some(record) = kept.next_record().unwrap() {
        names.push(record.name);
    }
    assert_eq!(names.len() as u64, written);
    assert_eq!(names.first().map(String::as_str), Some("read500"));
    assert_eq!(names.last().map(String::as_str), Some("read999"));
}

struct GatedReader {
    entered: mpsc::Sender<()>,
    proceed: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl RecordReader for GatedReader {
    fn read_record(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        let _ = self.entered.send(());
        self.proceed.lock().unwrap().recv().unwrap();
        Ok(None)
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn records_read(&self) -> u64 {
        0
    }
}

#[test]
fn test_busy_parser_fails_with_resource_busy() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let handle = ParserHandle::new(GatedReader {
        entered: entered_tx,
        proceed: Arc::new(Mutex::new(proceed_rx)),
    });

    let worker_handle = handle.clone();
    let worker = std::thread::spawn(move || worker_handle.pull());
    entered_rx.recv().unwrap();

    let mut engine = CountingEngine::new(12, &[1009]).unwrap();
    let mut parser = StreamingParser::new(handle);
    let err = engine
        .consume_file(&mut parser, &CancellationBridge::detached())
        .unwrap_err();
    assert_eq!(err.error_code(), "RESOURCE_BUSY");
    assert_eq!(err.records_processed(), None);

    proceed_tx.send(()).unwrap();
    assert!(worker.join().unwrap().unwrap().is_none());
}
