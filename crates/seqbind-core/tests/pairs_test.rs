//! Pair iteration under each pairing policy.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use seqbind_core::errors::{ParseError, SeqbindErrorCode};
use seqbind_core::stream::{ParserHandle, RecordPairIterator, RecordReader, StreamingParser};
use seqbind_core::types::{PairingPolicy, SequenceRecord};

fn fasta(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!(">{n}\nACGTACGT\n"))
        .collect::<String>()
}

fn open(dir: &tempfile::TempDir, content: &str) -> ParserHandle {
    let path = dir.path().join("pairs.fa");
    std::fs::write(&path, content).unwrap();
    ParserHandle::open(&path).unwrap()
}

fn names(pair: &seqbind_core::types::RecordPair) -> (String, String) {
    (pair.first.name.clone(), pair.second.name.clone())
}

#[test]
fn test_error_on_unpaired_accepts_slash_mates() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "a/2", "b/1", "b/2"]));
    let pairs: Vec<_> = RecordPairIterator::open(&handle, PairingPolicy::ErrorOnUnpaired)
        .map(|p| names(&p.unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("a/1".to_string(), "a/2".to_string()),
            ("b/1".to_string(), "b/2".to_string())
        ]
    );
}

#[test]
fn test_casava_annotations_pair() {
    let dir = tempfile::tempdir().unwrap();
    let content = ">x 1:N:0:ACGT\nACGT\n>x 2:N:0:ACGT\nACGT\n";
    let handle = open(&dir, content);
    let mut pairs = RecordPairIterator::open(&handle, PairingPolicy::ErrorOnUnpaired);
    let pair = pairs.next_pair().unwrap().unwrap();
    assert_eq!(pair.first.annotations, "1:N:0:ACGT");
    assert_eq!(pair.second.annotations, "2:N:0:ACGT");
    assert!(pairs.next_pair().unwrap().is_none());
}

#[test]
fn test_error_on_unpaired_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "b/2"]));
    let mut pairs = RecordPairIterator::open(&handle, PairingPolicy::ErrorOnUnpaired);
    let err = pairs.next_pair().unwrap_err();
    assert!(matches!(err, ParseError::InvalidReadPair { .. }));
    assert_eq!(err.error_code(), "INVALID_READ_PAIR");
    assert!(pairs.next_pair().unwrap().is_none());
}

#[test]
fn test_error_on_unpaired_odd_count() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "a/2", "c/1"]));
    let mut pairs = RecordPairIterator::open(&handle, PairingPolicy::ErrorOnUnpaired);
    assert!(pairs.next_pair().unwrap().is_some());
    assert!(matches!(
        pairs.next_pair(),
        Err(ParseError::InvalidReadPair { .. })
    ));
}

#[test]
fn test_ignore_unpaired_drops_orphans() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "b/1", "b/2", "c/2", "d/1", "d/2", "e/1"]));
    let pairs: Vec<_> = RecordPairIterator::open(&handle, PairingPolicy::IgnoreUnpaired)
        .map(|p| names(&p.unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("b/1".to_string(), "b/2".to_string()),
            ("d/1".to_string(), "d/2".to_string())
        ]
    );
}

#[test]
fn test_allow_unpaired_uses_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "b/1", "b/2", "c/2", "plain"]));
    let pairs: Vec<_> = RecordPairIterator::open(&handle, PairingPolicy::AllowUnpaired)
        .map(|p| p.unwrap())
        .collect();

    assert_eq!(pairs.len(), 4);
    assert_eq!(pairs[0].first.name, "a/1");
    assert!(pairs[0].second.is_placeholder());
    assert!(pairs[1].is_complete());
    assert_eq!(names(&pairs[1]), ("b/1".to_string(), "b/2".to_string()));
    assert!(pairs[2].first.is_placeholder());
    assert_eq!(pairs[2].second.name, "c/2");
    assert_eq!(pairs[3].first.name, "plain");
    assert!(pairs[3].second.is_placeholder());
}

#[test]
fn test_pairing_mode_validated_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "a/2"]));

    let err = RecordPairIterator::open_code(&handle, 3).unwrap_err();
    assert!(matches!(err, ParseError::UnknownPairingMode { .. }));
    assert!(RecordPairIterator::open_named(&handle, "sometimes").is_err());

    let it = RecordPairIterator::open_code(&handle, 0).unwrap();
    assert_eq!(it.policy(), PairingPolicy::AllowUnpaired);
    let it = RecordPairIterator::open_named(&handle, "ignore_unpaired").unwrap();
    assert_eq!(it.policy(), PairingPolicy::IgnoreUnpaired);
    assert_eq!(PairingPolicy::ErrorOnUnpaired.code(), 2);
}

#[test]
fn test_iterator_keeps_parser_alive() {
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir, &fasta(&["a/1", "a/2"]));
    let parser = StreamingParser::new(handle);
    let mut pairs = parser.pairs(PairingPolicy::ErrorOnUnpaired);
    assert_eq!(pairs.source().owners(), 2);

    drop(parser);
    assert_eq!(pairs.source().owners(), 1);
    assert!(pairs.next_pair().unwrap().is_some());
    assert!(pairs.next_pair().unwrap().is_none());
    assert!(pairs.next_pair().unwrap().is_none());
}

/// Reader that blocks inside `read_record` until told to continue.
struct GatedReader {
    entered: mpsc::Sender<()>,
    proceed: Arc<Mutex<mpsc::Receiver<()>>>,
    served: u64,
}

impl RecordReader for GatedReader {
    fn read_record(&mut self) -> Result<Option<SequenceRecord>, ParseError> {
        let _ = self.entered.send(());
        self.proceed.lock().unwrap().recv().unwrap();
        self.served += 1;
        Ok(Some(SequenceRecord::new(format!("r{}/1", self.served), "ACGT")))
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn records_read(&self) -> u64 {
        self.served
    }
}

#[test]
fn test_concurrent_pull_fails_fast_when_busy() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let handle = ParserHandle::new(GatedReader {
        entered: entered_tx,
        proceed: Arc::new(Mutex::new(proceed_rx)),
        served: 0,
    });

    let worker_handle = handle.clone();
    let worker = std::thread::spawn(move || worker_handle.pull());

    entered_rx.recv().unwrap();
    let mut pairs = RecordPairIterator::open(&handle, PairingPolicy::AllowUnpaired);
    assert!(matches!(pairs.next_pair(), Err(ParseError::Busy)));
    assert!(!handle.is_complete());

    proceed_tx.send(()).unwrap();
    let record = worker.join().unwrap().unwrap().unwrap();
    assert_eq!(record.name, "r1/1");
}
