//! Label table bindings: the presence operation set plus per-tag labels.

use std::path::Path;
use std::sync::{Arc, Mutex};

use napi::bindgen_prelude::{AsyncTask, BigInt};
use napi::{Env, JsUnknown};
use napi_derive::napi;

use seqbind_core::handle::{EngineHandle, OpaqueHandle};
use seqbind_core::types::Label;
use seqbind_engines::graph::{PartitionFlags, PartitionOutput};
use seqbind_engines::{ConsumeStats, LabelEngine, PresenceOps};

use super::parser::ReadParser;
use super::{consumer, lock, shared, try_lock, Shared};
use crate::conversions::error_codes::{invalid_argument, to_napi_error};
use crate::conversions::types::{
    count_to_js, handle_id_from_js, hash_from_js, sizes_from_js, JsConsumeResult, JsHandleRef,
    JsPartitionCounts, JsPartitionOutput, JsTrimResult,
};
use crate::observer::observer_choice;
use crate::runtime;
use crate::task::EngineTask;

/// Presence table whose tags carry sequence labels.
#[napi]
pub struct LabelTable {
    engine: EngineHandle<Shared<LabelEngine>>,
}

impl LabelTable {
    pub(crate) fn shared(&self) -> napi::Result<Shared<LabelEngine>> {
        shared(&self.engine)
    }

    fn wrap(engine: LabelEngine) -> Self {
        Self {
            engine: EngineHandle::new("LabelTable", Arc::new(Mutex::new(engine))),
        }
    }
}

fn label_from_js(label: i64) -> napi::Result<Label> {
    Label::try_from(label).map_err(|_| invalid_argument(format!("label {label} is negative")))
}

fn labels_to_js(labels: Vec<Label>) -> Vec<i64> {
    labels.into_iter().map(count_to_js).collect()
}

#[napi]
impl LabelTable {
    #[napi(constructor)]
    pub fn new(ksize: u32, sizes: Vec<i64>) -> napi::Result<Self> {
        let sizes = sizes_from_js(&sizes)?;
        let engine = LabelEngine::new(ksize, &sizes).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    #[napi(factory)]
    pub fn from_config() -> napi::Result<Self> {
        let rt = runtime::get()?;
        let engine = LabelEngine::from_config(&rt.config).map_err(to_napi_error)?;
        Ok(Self::wrap(engine))
    }

    /// Consume and tag `seq`, attaching `label` to every tag it touches.
    #[napi]
    pub fn consume_sequence_and_tag_with_labels(
        &self,
        seq: String,
        label: i64,
    ) -> napi::Result<i64> {
        let label = label_from_js(label)?;
        self.with_engine(|e| count_to_js(e.consume_sequence_and_tag_with_labels(&seq, label)))
    }

    /// Consume a file, giving each record a fresh label.
    #[napi]
    pub fn consume_file_and_tag_with_labels(
        &self,
        parser: &ReadParser,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
        let engine = self.shared()?;
        let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
        let mut stream = consumer(parser);
        Ok(AsyncTask::new(EngineTask::new(
            move || lock(&engine).consume_file_and_tag_with_labels(&mut stream, &bridge),
            |stats| Ok(JsConsumeResult::from(stats)),
        )))
    }

    #[napi]
    pub fn get_tag_labels(&self, tag: BigInt) -> napi::Result<Vec<i64>> {
        let tag = hash_from_js(&tag)?;
        self.with_engine(|e| labels_to_js(e.get_tag_labels(tag)))
    }

    #[napi]
    pub fn n_labels(&self) -> napi::Result<i64> {
        self.with_engine(|e| count_to_js(e.n_labels()))
    }

    /// Labels on tags within `range` steps of `seq`.
    #[napi]
    pub fn sweep_label_neighborhood(&self, seq: String, range: u32) -> napi::Result<Vec<i64>> {
        self.with_engine(|e| labels_to_js(e.sweep_label_neighborhood(&seq, range)))
    }
}

presence_ops!(LabelTable, LabelEngine);
