//! Counting table bindings.

use std::path::Path;
use std::sync::{Arc, Mutex};

use napi::bindgen_prelude::{AsyncTask, BigInt};
use napi::{Env, JsUnknown};
use napi_derive::napi;

use seqbind_core::handle::{EngineHandle, OpaqueHandle};
use seqbind_engines::graph::PartitionFlags;
use seqbind_engines::{ConsumeStats, CountingEngine};

use super::parser::ReadParser;
use super::presence::PresenceTable;
use super::{consumer, lock, shared, try_lock, Shared};
use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{
    count_to_js, handle_id_from_js, hash_from_js, sizes_from_js, JsConsumeResult, JsHandleRef,
    JsMedianCount, JsPartitionCounts, JsTrimResult,
};
use crate::observer::observer_choice;
use crate::runtime;
use crate::task::EngineTask;

/// Count-min k-mer table with a tag graph.
#[napi]
pub struct CountingTable {
    engine: EngineHandle<Shared<CountingEngine>>,
}

impl CountingTable {
    pub(crate) fn shared(&self) -> napi::Result<Shared<CountingEngine>> {
        shared(&self.engine)
    }

    fn wrap(engine: CountingEngine) -> Self {
        Self {
            engine: EngineHandle::new("CountingTable", Arc::new(Mutex::new(engine))),
        }
    }

    /// Run `f` on the engine from the JS thread. Fails with `RESOURCE_BUSY`
    /// while a task holds the engine.
    fn with_engine<T>(&self, f: impl FnOnce(&mut CountingEngine) -> T) -> napi::Result<T> {
        let engine = self.shared()?;
        let mut guard = try_lock(&engine, "CountingTable")?;
        Ok(f(&mut guard))
    }
}

#[napi]
impl CountingTable {
    #[napi(constructor)]
    pub fn new(ksize: u32, sizes: Vec<i64>) -> napi::Result<Self> {
        let sizes = sizes_from_js(&sizes)?;
        let engine = CountingEngine::new(ksize, &sizes).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    #[napi(factory)]
    pub fn from_config() -> napi::Result<Self> {
        let rt = runtime::get()?;
        let engine = CountingEngine::from_config(&rt.config).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    #[napi(getter)]
    pub fn ksize(&self) -> napi::Result<u32> {
        self.with_engine(|e| e.ksize())
    }

    #[napi]
    pub fn hashsizes(&self) -> napi::Result<Vec<i64>> {
        let sizes = self.with_engine(|e| e.hashsizes())?;
        Ok(sizes.into_iter().map(count_to_js).collect())
    }

    #[napi]
    pub fn set_use_bigcount(&self, enabled: bool) -> napi::Result<()> {
        self.with_engine(|e| e.set_use_bigcount(enabled))
    }

    #[napi]
    pub fn get_use_bigcount(&self) -> napi::Result<bool> {
        self.with_engine(|e| e.get_use_bigcount())
    }

    #[napi]
    pub fn consume(&self, seq: String) -> napi::Result<i64> {
        self.with_engine(|e| count_to_js(e.consume(&seq)))
    }

    #[napi]
    pub fn count(&self, kmer: String) -> napi::Result<()> {
        self.with_engine(|e| e.count(&kmer))?.map_err(to_napi_error)
    }

    #[napi]
    pub fn get(&self, kmer: String) -> napi::Result<u32> {
        self.with_engine(|e| e.get(&kmer))?.map_err(to_napi_error)
    }

    #[napi]
    pub fn get_min_count(&self, seq: String) -> napi::Result<u32> {
        self.with_engine(|e| e.get_min_count(&seq))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn get_max_count(&self, seq: String) -> napi::Result<u32> {
        self.with_engine(|e| e.get_max_count(&seq))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn get_median_count(&self, seq: String) -> napi::Result<JsMedianCount> {
        self.with_engine(|e| e.get_median_count(&seq))?
            .map(JsMedianCount::from)
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn n_unique_kmers(&self) -> napi::Result<i64> {
        self.with_engine(|e| count_to_js(e.n_unique_kmers()))
    }

    #[napi]
    pub fn n_occupied(&self) -> napi::Result<i64> {
        self.with_engine(|e| count_to_js(e.n_occupied()))
    }

    #[napi]
    pub fn n_tags(&self) -> napi::Result<u32> {
        self.with_engine(|e| e.n_tags() as u32)
    }

    #[napi]
    pub fn consume_file(
        &self,
        parser: &ReadParser,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
        let engine = self.shared()?;
        let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
        let mut stream = consumer(parser);
        Ok(AsyncTask::new(EngineTask::new(
            move || lock(&engine).consume_file(&mut stream, &bridge),
            |stats| Ok(JsConsumeResult::from(stats)),
        )))
    }

    /// Histogram of counts over the distinct k-mers of a file. `tracking`
    /// marks k-mers already seen and must share this table's k-mer size.
    #[napi]
    pub fn abundance_distribution(
        &self,
        parser: &ReadParser,
        tracking: &PresenceTable,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<Vec<u64>, Vec<i64>>>> {
        let engine = self.shared()?;
        let tracking = tracking.shared()?;
        let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
        let mut stream = consumer(parser);
        Ok(AsyncTask::new(EngineTask::new(
            move || {
                let counts = lock(&engine);
                let mut seen = lock(&tracking);
                counts.abundance_distribution(&mut stream, &mut seen, &bridge)
            },
            |histogram| Ok(histogram.into_iter().map(count_to_js).collect()),
        )))
    }

    #[napi]
    pub fn trim_on_abundance(&self, seq: String, min: u32) -> napi::Result<JsTrimResult> {
        let (sequence, length) = self.with_engine(|e| e.trim_on_abundance(&seq, min))?;
        Ok(JsTrimResult {
            sequence,
            length: length as u32,
        })
    }

    #[napi]
    pub fn consume_and_tag(&self, seq: String) -> napi::Result<i64> {
        self.with_engine(|e| count_to_js(e.consume_and_tag(&seq)))
    }

    /// Collect tags reachable from `kmer` through k-mers counted within
    /// `[min, max]`.
    #[napi]
    pub fn find_all_tags_truncate_on_abundance(
        &self,
        kmer: String,
        min: u32,
        max: u32,
    ) -> napi::Result<JsHandleRef> {
        let info = self
            .with_engine(|e| e.find_all_tags_truncate_on_abundance(&kmer, min, max))?
            .map_err(to_napi_error)?;
        Ok(runtime::get()?.register(info))
    }

    #[napi]
    pub fn assign_partition_id(&self, handle: i64) -> napi::Result<u32> {
        let id = handle_id_from_js(handle)?;
        runtime::get()?.with_handles(|registry| {
            let info = registry.get(id).map_err(to_napi_error)?;
            self.with_engine(|e| e.assign_partition_id(info))?
                .map_err(to_napi_error)
        })
    }

    #[napi]
    pub fn do_subset_partition_with_abundance(
        &self,
        min: u32,
        max: u32,
        start: Option<BigInt>,
        end: Option<BigInt>,
        stop_big_traversals: Option<bool>,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<OpaqueHandle, JsHandleRef>>> {
        let engine = self.shared()?;
        let rt = runtime::get()?;
        let start = start.as_ref().map(hash_from_js).transpose()?.unwrap_or(0);
        let end = end.as_ref().map(hash_from_js).transpose()?.unwrap_or(0);
        let flags = PartitionFlags {
            stop_big_traversals: stop_big_traversals
                .unwrap_or_else(|| rt.config.partition.effective_stop_big_traversals()),
            abundance: None,
        };
        let bridge = rt.bridge(&observer_choice(&env, observer)?);
        Ok(AsyncTask::new(EngineTask::new(
            move || {
                let engine = lock(&engine);
                engine.do_subset_partition_with_abundance(min, max, start, end, flags, &bridge)
            },
            |subset| Ok(runtime::get()?.register(subset)),
        )))
    }

    #[napi]
    pub fn merge_subset(&self, handle: i64) -> napi::Result<()> {
        let id = handle_id_from_js(handle)?;
        runtime::get()?.with_handles(|registry| {
            let subset = registry.get(id).map_err(to_napi_error)?;
            self.with_engine(|e| e.merge_subset(subset))?
                .map_err(to_napi_error)
        })
    }

    #[napi]
    pub fn merge_subset_from_disk(&self, path: String) -> napi::Result<()> {
        self.with_engine(|e| e.merge_subset_from_disk(Path::new(&path)))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn get_partition_id(&self, kmer: String) -> napi::Result<u32> {
        self.with_engine(|e| e.get_partition_id(&kmer))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn count_partitions(&self) -> napi::Result<JsPartitionCounts> {
        self.with_engine(|e| JsPartitionCounts::from(e.count_partitions()))
    }

    #[napi]
    pub fn save(&self, path: String) -> napi::Result<()> {
        self.with_engine(|e| e.save(Path::new(&path)))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn load(&self, path: String) -> napi::Result<()> {
        self.with_engine(|e| e.load(Path::new(&path)))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn release(&mut self) -> napi::Result<()> {
        self.engine.release().map_err(to_napi_error)
    }
}
