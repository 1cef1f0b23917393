//! The cancellation and progress bridge shared by every long-running
//! operation.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::errors::EngineError;
use crate::traits::{
    suspended, Cancellable, CancellationToken, HostLock, NoHostLock, ObserverChoice,
    ProgressDefaults, ProgressObserver,
};

/// Why a long-running operation was stopped at a report point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupted {
    /// The host raised an interrupt since the last check.
    HostInterrupt,
    /// The observer failed or asked to stop.
    ObserverFailed(String),
}

impl Interrupted {
    pub fn reason(&self) -> String {
        match self {
            Self::HostInterrupt => "interrupt requested".to_string(),
            Self::ObserverFailed(message) => format!("progress observer failed: {message}"),
        }
    }

    /// Convert into the engine failure for `operation`, keeping the progress
    /// reached so far.
    pub fn into_cancelled(self, operation: &str, records: u64, units: u64) -> EngineError {
        EngineError::Cancelled {
            operation: operation.to_string(),
            records,
            units,
            reason: self.reason(),
        }
    }
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for Interrupted {}

/// Single suspension and check point threaded through long-running work.
///
/// Each `report` call, in order: consumes a pending host interrupt, notifies
/// the resolved observer, then yields the host lock so other host work can
/// run. Clones share the interrupt flag, observer and host lock.
///
/// The first failure is latched: every later `report` on this bridge or any
/// of its clones fails the same way, so parallel workers sharing one bridge
/// all stop at their next report point.
#[derive(Clone)]
pub struct CancellationBridge {
    interrupt: CancellationToken,
    stopped: Arc<OnceLock<Interrupted>>,
    observer: Option<Arc<dyn ProgressObserver>>,
    host: Arc<dyn HostLock>,
}

impl CancellationBridge {
    /// Bridge over `interrupt` with no observer and no host lock.
    pub fn new(interrupt: CancellationToken) -> Self {
        Self {
            interrupt,
            stopped: Arc::new(OnceLock::new()),
            observer: None,
            host: Arc::new(NoHostLock),
        }
    }

    /// A bridge that never cancels and reports nowhere.
    pub fn detached() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Resolve `choice` against the process defaults and attach the result.
    pub fn with_observer(mut self, choice: &ObserverChoice, defaults: &ProgressDefaults) -> Self {
        self.observer = choice.resolve(defaults);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostLock>) -> Self {
        self.host = host;
        self
    }

    pub fn interrupt(&self) -> &CancellationToken {
        &self.interrupt
    }

    pub fn host(&self) -> &dyn HostLock {
        self.host.as_ref()
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// The failure that stopped this bridge, if any.
    pub fn stopped(&self) -> Option<&Interrupted> {
        self.stopped.get()
    }

    fn stop(&self, reason: Interrupted) -> Interrupted {
        self.stopped.get_or_init(|| reason).clone()
    }

    /// Report progress. An `Err` means the caller must stop and surface
    /// `Cancelled`, leaving its engine in a valid state.
    pub fn report(&self, tag: &str, primary: u64, secondary: u64) -> Result<(), Interrupted> {
        // Latch before consuming, so a clone that finds the flag already taken
        // also finds the latch set.
        if self.interrupt.is_cancelled() {
            let reason = self.stop(Interrupted::HostInterrupt);
            if self.interrupt.take() {
                tracing::warn!(tag, primary, secondary, "host interrupt consumed at report point");
            }
            return Err(reason);
        }
        if let Some(stopped) = self.stopped.get() {
            return Err(stopped.clone());
        }

        if let Some(observer) = &self.observer {
            if let Err(e) = observer.on_progress(tag, primary, secondary) {
                tracing::warn!(tag, primary, error = %e, "progress observer aborted operation");
                return Err(self.stop(Interrupted::ObserverFailed(e.message)));
            }
        }

        suspended(self.host.as_ref(), std::thread::yield_now);
        Ok(())
    }
}

impl fmt::Debug for CancellationBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationBridge")
            .field("interrupt_pending", &self.interrupt.is_cancelled())
            .field("has_observer", &self.has_observer())
            .field("stopped", &self.stopped.get())
            .finish()
    }
}
