//! JS-facing value types and the number conversions the bindings share.

use napi::bindgen_prelude::BigInt;
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use seqbind_core::handle::{HandleId, HandleKind};
use seqbind_core::types::{KmerHash, RecordPair, SequenceRecord};
use seqbind_engines::counting::MedianCount;
use seqbind_engines::graph::PartitionOutput;
use seqbind_engines::{Alignment, ConsumeStats};

use super::error_codes;

/// Options for `initialize()`.
#[napi(object)]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsInitOptions {
    /// Directory searched for `seqbind.toml`. Defaults to the working directory.
    pub project_root: Option<String>,
    /// Inline TOML, used instead of the project file.
    pub config_toml: Option<String>,
}

/// One sequence record.
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsRecord {
    pub name: String,
    pub sequence: String,
    pub quality: Option<String>,
    pub annotations: Option<String>,
}

impl From<SequenceRecord> for JsRecord {
    fn from(record: SequenceRecord) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            name: record.name,
            sequence: record.sequence,
            quality: non_empty(record.quality),
            annotations: non_empty(record.annotations),
        }
    }
}

/// A read pair. A missing mate is `null`.
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsRecordPair {
    pub first: Option<JsRecord>,
    pub second: Option<JsRecord>,
}

impl From<RecordPair> for JsRecordPair {
    fn from(pair: RecordPair) -> Self {
        let side = |r: SequenceRecord| {
            if r.is_placeholder() {
                None
            } else {
                Some(JsRecord::from(r))
            }
        };
        Self {
            first: side(pair.first),
            second: side(pair.second),
        }
    }
}

/// Result of a file-scale consume.
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsConsumeResult {
    pub records: i64,
    pub units: i64,
}

impl From<ConsumeStats> for JsConsumeResult {
    fn from(stats: ConsumeStats) -> Self {
        Self {
            records: count_to_js(stats.records),
            units: count_to_js(stats.units),
        }
    }
}

/// A registered opaque handle.
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsHandleRef {
    pub id: i64,
    pub kind: String,
}

impl JsHandleRef {
    pub fn new(id: HandleId, kind: HandleKind) -> Self {
        Self {
            id: handle_id_to_js(id),
            kind: kind.name().to_string(),
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsPartitionCounts {
    pub partitions: i64,
    pub unassigned: i64,
}

impl From<(u64, u64)> for JsPartitionCounts {
    fn from((partitions, unassigned): (u64, u64)) -> Self {
        Self {
            partitions: count_to_js(partitions),
            unassigned: count_to_js(unassigned),
        }
    }
}

/// Result of `outputPartitions`.
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsPartitionOutput {
    pub records: i64,
    pub written: i64,
    pub partitions: i64,
}

impl From<PartitionOutput> for JsPartitionOutput {
    fn from(output: PartitionOutput) -> Self {
        Self {
            records: count_to_js(output.records),
            written: count_to_js(output.written),
            partitions: count_to_js(output.partitions),
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsMedianCount {
    pub median: u32,
    pub average: f64,
    pub stddev: f64,
}

impl From<MedianCount> for JsMedianCount {
    fn from(m: MedianCount) -> Self {
        Self {
            median: m.median,
            average: m.average,
            stddev: m.stddev,
        }
    }
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsTrimResult {
    pub sequence: String,
    pub length: u32,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsAlignment {
    pub score: f64,
    pub graph_alignment: String,
    pub read_alignment: String,
    pub truncated: bool,
}

impl From<Alignment> for JsAlignment {
    fn from(a: Alignment) -> Self {
        Self {
            score: a.score,
            graph_alignment: a.graph_alignment,
            read_alignment: a.read_alignment,
            truncated: a.truncated,
        }
    }
}

/// Counts saturate at `i64::MAX` on the way to JS.
pub fn count_to_js(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn handle_id_to_js(id: HandleId) -> i64 {
    count_to_js(id.as_u64())
}

pub fn handle_id_from_js(id: i64) -> napi::Result<HandleId> {
    u64::try_from(id)
        .map(HandleId::from_u64)
        .map_err(|_| error_codes::invalid_argument(format!("handle id {id} is negative")))
}

/// Table sizes from JS numbers. Every size must be positive.
pub fn sizes_from_js(sizes: &[i64]) -> napi::Result<Vec<u64>> {
    sizes
        .iter()
        .map(|&s| {
            u64::try_from(s)
                .ok()
                .filter(|&s| s > 0)
                .ok_or_else(|| {
                    error_codes::invalid_argument(format!("table size {s} is not positive"))
                })
        })
        .collect()
}

/// A k-mer hash from a JS BigInt. Negative or wider than 64 bits is rejected.
pub fn hash_from_js(hash: &BigInt) -> napi::Result<KmerHash> {
    match hash.words.as_slice() {
        [] => Ok(0),
        [word] if !hash.sign_bit || *word == 0 => Ok(*word),
        _ => Err(error_codes::invalid_argument(
            "k-mer hash must be a non-negative 64-bit integer",
        )),
    }
}

pub fn hash_to_js(hash: KmerHash) -> BigInt {
    BigInt::from(hash)
}
