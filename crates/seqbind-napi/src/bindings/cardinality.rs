//! HyperLogLog bindings.

use std::sync::{Arc, Mutex};

use napi::bindgen_prelude::AsyncTask;
use napi::{Env, JsUnknown};
use napi_derive::napi;

use seqbind_engines::{ConsumeStats, HllCounter};

use super::parser::ReadParser;
use super::{consumer, lock, try_lock, Shared};
use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{count_to_js, JsConsumeResult};
use crate::observer::observer_choice;
use crate::runtime;
use crate::task::EngineTask;

#[napi(js_name = "HllCounter")]
pub struct JsHllCounter {
    counter: Shared<HllCounter>,
}

impl JsHllCounter {
    fn with_counter<T>(&self, f: impl FnOnce(&mut HllCounter) -> T) -> napi::Result<T> {
        let mut counter = try_lock(&self.counter, "HllCounter")?;
        Ok(f(&mut counter))
    }
}

#[napi]
impl JsHllCounter {
    /// `error_rate` must lie strictly between 0 and 1.
    #[napi(constructor)]
    pub fn new(error_rate: f64, ksize: u32) -> napi::Result<Self> {
        let counter = HllCounter::new(error_rate, ksize).map_err(to_napi_error)?;
        Ok(Self {
            counter: Arc::new(Mutex::new(counter)),
        })
    }

    #[napi(getter)]
    pub fn ksize(&self) -> napi::Result<u32> {
        self.with_counter(|c| c.ksize())
    }

    #[napi(getter)]
    pub fn precision(&self) -> napi::Result<u32> {
        self.with_counter(|c| c.precision())
    }

    #[napi(getter)]
    pub fn error_rate(&self) -> napi::Result<f64> {
        self.with_counter(|c| c.error_rate())
    }

    #[napi]
    pub fn add(&self, kmer: String) -> napi::Result<()> {
        self.with_counter(|c| c.add(&kmer))?.map_err(to_napi_error)
    }

    #[napi]
    pub fn consume_string(&self, seq: String) -> napi::Result<i64> {
        self.with_counter(|c| count_to_js(c.consume_string(&seq)))
    }

    #[napi]
    pub fn consume_file(
        &self,
        parser: &ReadParser,
        env: Env,
        observer: JsUnknown,
    ) -> napi::Result<AsyncTask<EngineTask<ConsumeStats, JsConsumeResult>>> {
        let counter = Arc::clone(&self.counter);
        let bridge = runtime::get()?.bridge(&observer_choice(&env, observer)?);
        let mut stream = consumer(parser);
        Ok(AsyncTask::new(EngineTask::new(
            move || lock(&counter).consume_file(&mut stream, &bridge),
            |stats| Ok(JsConsumeResult::from(stats)),
        )))
    }

    #[napi]
    pub fn estimate_cardinality(&self) -> napi::Result<i64> {
        self.with_counter(|c| count_to_js(c.estimate_cardinality()))
    }

    /// Fold `other` into this counter.
    #[napi]
    pub fn merge(&self, other: &JsHllCounter) -> napi::Result<()> {
        // Copy first: merging a counter into itself must not lock twice.
        let theirs = other.with_counter(|c| c.clone())?;
        self.with_counter(|c| c.merge(&theirs))?.map_err(to_napi_error)
    }
}
