//! Record and pair iteration over FASTA/FASTQ files.
//!
//! `nextRecord` and `nextPair` read on the JS thread and suit small or
//! in-memory inputs. The `Async` variants read on the thread pool.

use std::sync::{Arc, Mutex};

use napi::bindgen_prelude::AsyncTask;
use napi::Either;
use napi_derive::napi;

use seqbind_core::stream::{ParserHandle, RecordPairIterator, StreamingParser};
use seqbind_core::types::{PairingPolicy, RecordPair, SequenceRecord};

use super::{lock, try_lock};
use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{count_to_js, JsRecord, JsRecordPair};
use crate::runtime;
use crate::task::EngineTask;

/// A streaming reader over one sequence file.
#[napi]
pub struct ReadParser {
    parser: StreamingParser,
}

impl ReadParser {
    pub(crate) fn stream(&self) -> &ParserHandle {
        self.parser.handle()
    }

    /// Pull of the next record, to run off the JS thread.
    pub fn next_record_task(&self) -> EngineTask<Option<SequenceRecord>, Option<JsRecord>> {
        let handle = self.parser.handle().clone();
        EngineTask::new(
            move || Ok(handle.pull()?),
            |record| Ok(record.map(JsRecord::from)),
        )
    }
}

#[napi]
impl ReadParser {
    /// Open `path`. Gzip input is recognised by a `.gz` extension.
    #[napi(constructor)]
    pub fn new(path: String) -> napi::Result<Self> {
        let parser = StreamingParser::open(&path).map_err(to_napi_error)?;
        Ok(Self { parser })
    }

    /// The next record, or `null` at end of stream. Reads on the JS thread.
    #[napi]
    pub fn next_record(&mut self) -> napi::Result<Option<JsRecord>> {
        self.parser
            .next_record()
            .map(|record| record.map(JsRecord::from))
            .map_err(to_napi_error)
    }

    /// Resolves to the next record, or `null` at end of stream.
    #[napi]
    pub fn next_record_async(
        &self,
    ) -> AsyncTask<EngineTask<Option<SequenceRecord>, Option<JsRecord>>> {
        AsyncTask::new(self.next_record_task())
    }

    #[napi(getter)]
    pub fn is_complete(&self) -> bool {
        self.parser.is_complete()
    }

    #[napi(getter)]
    pub fn records_read(&self) -> i64 {
        count_to_js(self.parser.records_read())
    }

    /// Iterate pairs from this stream. `mode` is a policy name or code; when
    /// omitted the configured default applies.
    #[napi]
    pub fn read_pairs(&self, mode: Option<Either<String, i64>>) -> napi::Result<ReadPairIterator> {
        let handle = self.parser.handle();
        let pairs = match mode {
            Some(Either::A(name)) => RecordPairIterator::open_named(handle, &name),
            Some(Either::B(code)) => RecordPairIterator::open_code(handle, code),
            None => default_pairing().map(|policy| RecordPairIterator::open(handle, policy)),
        }
        .map_err(to_napi_error)?;
        Ok(ReadPairIterator::new(pairs))
    }
}

fn default_pairing() -> Result<PairingPolicy, seqbind_core::errors::ParseError> {
    match runtime::get() {
        Ok(rt) => rt.config.parser.effective_default_pairing(),
        Err(_) => Ok(PairingPolicy::default()),
    }
}

/// Pairs drawn from a `ReadParser` under one pairing policy.
#[napi]
pub struct ReadPairIterator {
    pairs: Arc<Mutex<RecordPairIterator>>,
}

impl ReadPairIterator {
    pub fn new(pairs: RecordPairIterator) -> Self {
        Self {
            pairs: Arc::new(Mutex::new(pairs)),
        }
    }

    /// Pull of the next pair, to run off the JS thread.
    pub fn next_pair_task(&self) -> EngineTask<Option<RecordPair>, Option<JsRecordPair>> {
        let pairs = Arc::clone(&self.pairs);
        EngineTask::new(
            move || Ok(lock(&pairs).next_pair()?),
            |pair| Ok(pair.map(JsRecordPair::from)),
        )
    }
}

#[napi]
impl ReadPairIterator {
    /// The next pair, or `null` at end of stream. Reads on the JS thread and
    /// fails with `RESOURCE_BUSY` while `nextPairAsync` is pending.
    #[napi]
    pub fn next_pair(&self) -> napi::Result<Option<JsRecordPair>> {
        try_lock(&self.pairs, "ReadPairIterator")?
            .next_pair()
            .map(|pair| pair.map(JsRecordPair::from))
            .map_err(to_napi_error)
    }

    /// Resolves to the next pair, or `null` at end of stream.
    #[napi]
    pub fn next_pair_async(
        &self,
    ) -> AsyncTask<EngineTask<Option<RecordPair>, Option<JsRecordPair>>> {
        AsyncTask::new(self.next_pair_task())
    }

    #[napi(getter)]
    pub fn policy(&self) -> napi::Result<String> {
        let pairs = try_lock(&self.pairs, "ReadPairIterator")?;
        Ok(pairs.policy().name().to_string())
    }
}
