//! Progress observers and the process-wide default observer.

use std::fmt;
use std::sync::{Arc, RwLock};

/// An observer refused to continue, or failed while being notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverError {
    pub message: String,
}

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ObserverError {}

/// Receives `(tag, primary, secondary)` progress notifications from a long
/// running operation. Returning an error aborts the operation.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, tag: &str, primary: u64, secondary: u64) -> Result<(), ObserverError>;
}

impl<F> ProgressObserver for F
where
    F: Fn(&str, u64, u64) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_progress(&self, tag: &str, primary: u64, secondary: u64) -> Result<(), ObserverError> {
        self(tag, primary, secondary)
    }
}

/// Per-call observer selection.
#[derive(Clone, Default)]
pub enum ObserverChoice {
    /// Use the process-wide default, if one is set.
    #[default]
    Default,
    /// No observer at all, not even the default.
    Suppressed,
    /// This observer instead of the default.
    Explicit(Arc<dyn ProgressObserver>),
}

impl fmt::Debug for ObserverChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Suppressed => f.write_str("Suppressed"),
            Self::Explicit(_) => f.write_str("Explicit(..)"),
        }
    }
}

impl ObserverChoice {
    /// Resolve against the process defaults into the observer to call.
    pub fn resolve(&self, defaults: &ProgressDefaults) -> Option<Arc<dyn ProgressObserver>> {
        match self {
            Self::Default => defaults.get(),
            Self::Suppressed => None,
            Self::Explicit(obs) => Some(Arc::clone(obs)),
        }
    }
}

/// The process-wide default observer. Starts unset.
///
/// Owned by the host runtime and passed to whoever builds a bridge.
#[derive(Default)]
pub struct ProgressDefaults {
    observer: RwLock<Option<Arc<dyn ProgressObserver>>>,
}

impl ProgressDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `observer` as the default, replacing any previous one.
    pub fn set(&self, observer: Arc<dyn ProgressObserver>) {
        let mut slot = self.observer.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(observer);
    }

    /// Remove the default. Returns true if one was set.
    pub fn clear(&self) -> bool {
        let mut slot = self.observer.write().unwrap_or_else(|e| e.into_inner());
        slot.take().is_some()
    }

    pub fn get(&self) -> Option<Arc<dyn ProgressObserver>> {
        let slot = self.observer.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for ProgressDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDefaults")
            .field("set", &self.is_set())
            .finish()
    }
}
