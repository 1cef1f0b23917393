//! Blocking engine work on the libuv thread pool.
//!
//! Every long-running call returns an `AsyncTask`, so the JS thread is free
//! while the engine runs. `compute` runs on a worker, `resolve` back on the
//! JS thread.

use napi::bindgen_prelude::{ToNapiValue, TypeName};
use napi::{Env, Task};

use seqbind_core::errors::EngineResult;

use crate::conversions::error_codes;

type Work<T> = Box<dyn FnOnce() -> EngineResult<T> + Send>;

pub struct EngineTask<T, J> {
    work: Option<Work<T>>,
    convert: fn(T) -> napi::Result<J>,
}

impl<T, J> EngineTask<T, J> {
    pub fn new(
        work: impl FnOnce() -> EngineResult<T> + Send + 'static,
        convert: fn(T) -> napi::Result<J>,
    ) -> Self {
        Self {
            work: Some(Box::new(work)),
            convert,
        }
    }
}

impl<T, J> Task for EngineTask<T, J>
where
    T: Send + 'static,
    J: ToNapiValue + TypeName,
{
    type Output = T;
    type JsValue = J;

    fn compute(&mut self) -> napi::Result<T> {
        let work = self
            .work
            .take()
            .ok_or_else(|| error_codes::internal_error("engine task ran twice"))?;
        work().map_err(error_codes::to_napi_error)
    }

    fn resolve(&mut self, _env: Env, output: T) -> napi::Result<J> {
        (self.convert)(output)
    }
}
