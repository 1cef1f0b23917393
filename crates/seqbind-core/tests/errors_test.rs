//! Error code mapping and host string formatting.

use std::path::PathBuf;

use seqbind_core::errors::{EngineError, HandleError, ParseError, SeqbindErrorCode};

#[test]
fn test_parse_error_codes() {
    let invalid = ParseError::InvalidStream {
        path: PathBuf::from("missing.fa"),
        message: "No such file".to_string(),
    };
    assert_eq!(invalid.error_code(), "INVALID_STREAM");
    assert_eq!(ParseError::stream_read(3, "bad").error_code(), "STREAM_READ_ERROR");
    assert_eq!(ParseError::Busy.error_code(), "RESOURCE_BUSY");
    assert_eq!(EngineError::busy("presence table").error_code(), "RESOURCE_BUSY");
    assert_eq!(
        EngineError::busy("presence table").to_string(),
        "presence table is busy with another operation"
    );
    assert_eq!(
        ParseError::UnknownPairingMode { mode: "7".into() }.error_code(),
        "UNKNOWN_PAIRING_MODE"
    );
    assert_eq!(
        ParseError::InvalidReadPair {
            first: "a/1".into(),
            second: "b/2".into()
        }
        .error_code(),
        "INVALID_READ_PAIR"
    );
}

#[test]
fn test_handle_errors_are_invalid_handle() {
    let errors = [
        HandleError::KindMismatch {
            expected: "subset_partition",
            found: "pre_partition_info",
        },
        HandleError::Destroyed { kind: "counting" },
        HandleError::Stale { id: "0v1".into() },
    ];
    for e in errors {
        assert_eq!(e.error_code(), "INVALID_HANDLE");
    }
}

#[test]
fn test_engine_error_delegates_codes() {
    let cancelled = EngineError::Cancelled {
        operation: "consume_file".into(),
        records: 2000,
        units: 100_000,
        reason: "interrupt requested".into(),
    };
    assert_eq!(cancelled.error_code(), "CANCELLED");
    assert!(cancelled.is_cancelled());
    assert_eq!(cancelled.records_processed(), Some(2000));

    let stream = EngineError::Stream {
        operation: "consume_file".into(),
        records: 42,
        source: ParseError::stream_read(42, "truncated"),
    };
    assert_eq!(stream.error_code(), "STREAM_READ_ERROR");
    assert_eq!(stream.records_processed(), Some(42));
    assert!(stream.to_string().contains("42 records consumed before failure"));

    let handle: EngineError = HandleError::Destroyed { kind: "x" }.into();
    assert_eq!(handle.error_code(), "INVALID_HANDLE");

    assert_eq!(EngineError::file("a.pt", "bad json").error_code(), "FILE_ERROR");
    assert_eq!(EngineError::InvalidArgument("k".into()).error_code(), "INVALID_ARGUMENT");
    assert_eq!(
        EngineError::Computation("overflow".into()).error_code(),
        "NATIVE_COMPUTATION_FAILURE"
    );
}

#[test]
fn test_host_string_format() {
    let e = ParseError::UnknownPairingMode { mode: "3".into() };
    assert_eq!(e.host_string(), "[UNKNOWN_PAIRING_MODE] Unknown pair reading mode: 3");
}
