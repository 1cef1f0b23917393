//! Presence table bindings.

use std::path::Path;
use std::sync::{Arc, Mutex};

use napi::bindgen_prelude::{AsyncTask, BigInt};
use napi::{Env, JsUnknown};
use napi_derive::napi;

use seqbind_core::handle::{EngineHandle, OpaqueHandle};
use seqbind_engines::graph::{PartitionFlags, PartitionOutput};
use seqbind_engines::{partition_in_shards, ConsumeStats, PresenceEngine, PresenceOps};

use super::parser::ReadParser;
use super::{consumer, lock, shared, try_lock, Shared};
use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{
    count_to_js, handle_id_from_js, hash_from_js, sizes_from_js, JsConsumeResult, JsHandleRef,
    JsPartitionCounts, JsPartitionOutput, JsTrimResult,
};
use crate::observer::observer_choice;
use crate::runtime;
use crate::task::EngineTask;

/// One-bit-per-entry k-mer presence table with a tag graph.
#[napi]
pub struct PresenceTable {
    engine: EngineHandle<Shared<PresenceEngine>>,
}

impl PresenceTable {
    pub(crate) fn shared(&self) -> napi::Result<Shared<PresenceEngine>> {
        shared(&self.engine)
    }

    fn wrap(engine: PresenceEngine) -> Self {
        Self {
            engine: EngineHandle::new("PresenceTable", Arc::new(Mutex::new(engine))),
        }
    }
}

#[napi]
impl PresenceTable {
    #[napi(constructor)]
    pub fn new(ksize: u32, sizes: Vec<i64>) -> napi::Result<Self> {
        let sizes = sizes_from_js(&sizes)?;
        let engine = PresenceEngine::new(ksize, &sizes).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    /// A table sized from the runtime configuration.
    #[napi(factory)]
    pub fn from_config() -> napi::Result<Self> {
        let rt = runtime::get()?;
        let engine = PresenceEngine::from_config(&rt.config).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    /// Partition the tag set in `shards` disjoint ranges concurrently.
    /// Resolves to one subset handle per shard.
    #[napi]
    pub fn partition_in_shards(
        &self,
        shards: u32,
        stop_big_traversals: Option<bool>,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<Vec<OpaqueHandle>, Vec<JsHandleRef>>>> {
        let engine = self.shared()?;
        let rt = runtime::get()?;
        let flags = PartitionFlags {
            stop_big_traversals: stop_big_traversals
                .unwrap_or_else(|| rt.config.partition.effective_stop_big_traversals()),
            abundance: None,
        };
        let bridge = rt.bridge(&observer_choice(&env, observer)?);
        Ok(AsyncTask::new(EngineTask::new(
            move || partition_in_shards(&lock(&engine), shards as usize, flags, &bridge),
            |subsets| {
                let rt = runtime::get()?;
                Ok(subsets.into_iter().map(|s| rt.register(s)).collect())
            },
        )))
    }
}

presence_ops!(PresenceTable, PresenceEngine);
