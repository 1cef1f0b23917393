//! The consume loop shared by every file-scale operation.

use serde::Serialize;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::errors::{EngineError, EngineResult, ParseError};
use seqbind_core::stream::StreamingParser;
use seqbind_core::types::SequenceRecord;

/// Progress of a file-scale operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumeStats {
    /// Records pulled from the parser.
    pub records: u64,
    /// Operation-specific work units (k-mers, kept records).
    pub units: u64,
}

/// Pull every record from `parser` into `step`, reporting through `bridge`
/// after every `interval` records.
///
/// A parse failure is returned as `EngineError::Stream` and an interrupt as
/// `EngineError::Cancelled`, both carrying the progress reached.
pub fn consume_records<F>(
    operation: &str,
    parser: &mut StreamingParser,
    bridge: &CancellationBridge,
    interval: u64,
    mut step: F,
) -> EngineResult<ConsumeStats>
where
    F: FnMut(&SequenceRecord) -> EngineResult<u64>,
{
    let interval = interval.max(1);
    let mut stats = ConsumeStats::default();
    tracing::info!(operation, interval, "consume started");

    loop {
        let record = match parser.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(ParseError::Busy) => return Err(ParseError::Busy.into()),
            Err(source) => {
                tracing::warn!(
                    operation,
                    records = stats.records,
                    error = %source,
                    "consume stopped by stream error"
                );
                return Err(EngineError::Stream {
                    operation: operation.to_string(),
                    records: stats.records,
                    source,
                });
            }
        };

        stats.units += step(&record)?;
        stats.records += 1;

        if stats.records % interval == 0 {
            bridge
                .report(operation, stats.records, stats.units)
                .map_err(|interrupted| {
                    interrupted.into_cancelled(operation, stats.records, stats.units)
                })?;
        }
    }

    tracing::info!(
        operation,
        records = stats.records,
        units = stats.units,
        "consume finished"
    );
    Ok(stats)
}
