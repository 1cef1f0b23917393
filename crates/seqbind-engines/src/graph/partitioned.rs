//! Partitioned sequence files: records annotated with a trailing
//! `\t<partition id>` on the header line.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Serialize;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::errors::{EngineError, EngineResult, ParseError};
use seqbind_core::stream::{write_record, StreamingParser};
use seqbind_core::types::{PartitionId, SequenceRecord};

use super::TagGraph;
use crate::driver::{consume_records, ConsumeStats};
use crate::kmer::KmerIterator;
use crate::table::KmerTable;

/// Result of writing a partitioned file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionOutput {
    /// Records read from the input.
    pub records: u64,
    /// Records written to the output.
    pub written: u64,
    /// Distinct non-zero partitions among the written records.
    pub partitions: u64,
}

/// Partition id carried by a record header: the last field after the name.
///
/// Readers split the header at the first whitespace, so the id may sit at
/// the end of either the name or the annotations.
pub fn parse_partition_id(record: &SequenceRecord) -> Option<PartitionId> {
    let header = format!("{} {}", record.name, record.annotations);
    let mut fields = header.split_whitespace();
    fields.next()?;
    fields.last()?.parse().ok()
}

fn write_partitioned<W: Write>(
    out: &mut W,
    record: &SequenceRecord,
    pid: PartitionId,
) -> io::Result<()> {
    let mut header = record.name.clone();
    if !record.annotations.is_empty() {
        header.push(' ');
        header.push_str(&record.annotations);
    }
    let annotated = SequenceRecord {
        name: format!("{header}\t{pid}"),
        annotations: String::new(),
        ..record.clone()
    };
    write_record(out, &annotated)
}

impl TagGraph {
    /// Partition of the first partitioned tag along `seq`, or 0.
    fn partition_of(&self, seq: &str) -> PartitionId {
        KmerIterator::new(seq, self.ksize)
            .map(|kmer| kmer.canonical())
            .find(|&hash| self.tags.contains(hash) && self.partitions.contains(hash))
            .map_or(0, |hash| self.partitions.get(hash))
    }

    /// Write every record of `parser` to `out` with its partition id
    /// appended to the header. Records with no partition are written with id
    /// 0 when `output_unassigned` is set and skipped otherwise.
    ///
    /// The output is flushed before returning, including on cancellation, so
    /// it always holds whole records.
    pub fn output_partitions(
        &self,
        parser: &mut StreamingParser,
        out: &Path,
        output_unassigned: bool,
        bridge: &CancellationBridge,
        interval: u64,
    ) -> EngineResult<PartitionOutput> {
        let file = File::create(out).map_err(|e| EngineError::file(out, e))?;
        let mut writer = BufWriter::new(file);
        let mut seen: FxHashSet<PartitionId> = FxHashSet::default();

        let result = consume_records("output_partitions", parser, bridge, interval, |record| {
            let pid = self.partition_of(&record.sequence);
            if pid == 0 && !output_unassigned {
                return Ok(0);
            }
            if pid != 0 {
                seen.insert(pid);
            }
            write_partitioned(&mut writer, record, pid).map_err(|e| EngineError::file(out, e))?;
            Ok(1)
        });
        writer.flush().map_err(|e| EngineError::file(out, e))?;

        let stats = result?;
        tracing::info!(
            written = stats.units,
            partitions = seen.len(),
            "partitioned output written"
        );
        Ok(PartitionOutput {
            records: stats.records,
            written: stats.units,
            partitions: seen.len() as u64,
        })
    }

    /// Consume a partitioned file: count every k-mer, tag the first k-mer of
    /// each record and put that tag in the record's partition.
    ///
    /// A record whose header carries no partition id is a stream error.
    pub fn consume_partitioned(
        &mut self,
        table: &mut dyn KmerTable,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
        interval: u64,
    ) -> EngineResult<ConsumeStats> {
        let operation = "consume_partitioned_file";
        let mut records = 0u64;

        consume_records(operation, parser, bridge, interval, |record| {
            let pid = parse_partition_id(record).ok_or_else(|| EngineError::Stream {
                operation: operation.to_string(),
                records,
                source: ParseError::stream_read(
                    records,
                    format!("record {:?} has no partition id", record.name),
                ),
            })?;
            records += 1;

            let mut consumed = 0u64;
            let mut first = None;
            for kmer in KmerIterator::new(&record.sequence, self.ksize) {
                let hash = kmer.canonical();
                table.count(hash);
                first.get_or_insert(hash);
                consumed += 1;
            }
            if let Some(tag) = first {
                self.tags.insert(tag);
                self.partitions.assign(tag, pid);
            }
            Ok(consumed)
        })
    }
}
