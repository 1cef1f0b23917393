//! SeqbindRuntime: singleton via `OnceLock`, lock-free after initialization.
//!
//! The runtime owns the configuration, the process interrupt flag, the
//! default progress observer and the registry of opaque handles handed to JS.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::SeqbindConfig;
use seqbind_core::handle::{HandleId, HandleRegistry, OpaqueHandle};
use seqbind_core::traits::{CancellationToken, ObserverChoice, ProgressDefaults};

use crate::conversions::error_codes;
use crate::conversions::types::JsHandleRef;

static RUNTIME: OnceLock<Arc<SeqbindRuntime>> = OnceLock::new();

pub struct SeqbindRuntime {
    pub config: SeqbindConfig,
    /// Raised by `requestInterrupt()`, taken by the next report point.
    pub interrupt: CancellationToken,
    pub progress: ProgressDefaults,
    handles: Mutex<HandleRegistry>,
}

/// Options for initializing the runtime.
#[derive(Debug, Default)]
pub struct RuntimeOptions {
    /// Directory searched for `seqbind.toml`. If None, the working directory.
    pub project_root: Option<PathBuf>,
    /// TOML configuration string. Takes precedence over the project file.
    pub config_toml: Option<String>,
}

impl SeqbindRuntime {
    pub fn new(opts: RuntimeOptions) -> napi::Result<Self> {
        seqbind_core::tracing::init_tracing();

        let config = match (opts.config_toml, opts.project_root) {
            (Some(toml), _) => SeqbindConfig::from_toml(&toml),
            (None, Some(root)) => SeqbindConfig::load(&root),
            (None, None) => {
                let cwd = std::env::current_dir().map_err(error_codes::internal_error)?;
                SeqbindConfig::load(&cwd)
            }
        }
        .map_err(error_codes::to_napi_error)?;

        tracing::info!(
            ksize = config.tables.effective_ksize(),
            report_interval = config.progress.effective_report_interval(),
            "seqbind runtime initialized"
        );

        Ok(Self {
            config,
            interrupt: CancellationToken::new(),
            progress: ProgressDefaults::new(),
            handles: Mutex::new(HandleRegistry::new()),
        })
    }

    /// A bridge for one call, observing the process interrupt flag.
    pub fn bridge(&self, choice: &ObserverChoice) -> CancellationBridge {
        CancellationBridge::new(self.interrupt.clone()).with_observer(choice, &self.progress)
    }

    /// Run `f` against the handle registry.
    pub fn with_handles<R>(&self, f: impl FnOnce(&mut HandleRegistry) -> R) -> R {
        let mut registry = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut registry)
    }

    pub fn register(&self, handle: OpaqueHandle) -> JsHandleRef {
        let kind = handle.kind();
        let id = self.with_handles(|registry| registry.insert(handle));
        tracing::debug!(%id, kind = kind.name(), "handle registered");
        JsHandleRef::new(id, kind)
    }

    pub fn destroy_handle(&self, id: HandleId) -> napi::Result<()> {
        self.with_handles(|registry| registry.destroy(id))
            .map_err(error_codes::to_napi_error)?;
        tracing::debug!(%id, "handle destroyed");
        Ok(())
    }
}

/// Initialize the global runtime.
///
/// Returns an error if already initialized or if initialization fails.
pub fn initialize(opts: RuntimeOptions) -> napi::Result<()> {
    let runtime = SeqbindRuntime::new(opts)?;
    RUNTIME.set(Arc::new(runtime)).map_err(|_| {
        napi::Error::from_reason(format!(
            "[{}] seqbind runtime already initialized",
            error_codes::ALREADY_INITIALIZED
        ))
    })
}

/// Get the global runtime. Lock-free after init.
pub fn get() -> napi::Result<Arc<SeqbindRuntime>> {
    RUNTIME
        .get()
        .cloned()
        .ok_or_else(error_codes::runtime_not_initialized)
}

pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}
