//! Lifecycle bindings: initialize, default progress observer, interrupts.

use std::path::PathBuf;
use std::sync::Arc;

use napi::{Env, JsFunction};
use napi_derive::napi;

use seqbind_core::constants::VERSION;
use seqbind_core::traits::Cancellable;

use crate::conversions::types::JsInitOptions;
use crate::observer::JsProgressObserver;
use crate::runtime::{self, RuntimeOptions};

/// Initialize the seqbind runtime.
///
/// Must be called before any engine or handle function.
#[napi]
pub fn initialize(options: Option<JsInitOptions>) -> napi::Result<()> {
    let options = options.unwrap_or_default();
    runtime::initialize(RuntimeOptions {
        project_root: options.project_root.map(PathBuf::from),
        config_toml: options.config_toml,
    })
}

/// Install `callback(tag, primary, secondary)` as the process default
/// progress observer, replacing any previous one.
#[napi]
pub fn set_reporting_callback(env: Env, callback: JsFunction) -> napi::Result<()> {
    let observer = JsProgressObserver::new(&env, callback)?.unref(&env)?;
    runtime::get()?.progress.set(Arc::new(observer));
    tracing::debug!("default progress observer set");
    Ok(())
}

/// Remove the default observer. Returns true if one was set.
#[napi]
pub fn clear_reporting_callback() -> napi::Result<bool> {
    Ok(runtime::get()?.progress.clear())
}

/// Ask the running operations to stop at their next report point.
#[napi]
pub fn request_interrupt() -> napi::Result<()> {
    runtime::get()?.interrupt.cancel();
    tracing::info!("interrupt requested");
    Ok(())
}

#[napi]
pub fn version() -> String {
    VERSION.to_string()
}
