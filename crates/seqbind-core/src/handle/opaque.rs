//! Tagged opaque handles with a destructor bound at construction.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::HandleError;

/// Kind tag carried by every opaque handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// A seed key plus the tagged keys discovered from it, awaiting a
    /// partition id.
    PrePartitionInfo,
    /// A detached partition sub-engine.
    SubsetPartition,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::PrePartitionInfo => "pre_partition_info",
            Self::SubsetPartition => "subset_partition",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type that can live inside an `OpaqueHandle`.
pub trait HandlePayload: Any + Send + Sized {
    const KIND: HandleKind;

    /// Teardown run exactly once when the owning handle is destroyed.
    fn release(self) {}
}

/// Partial native state passed between otherwise independent calls.
///
/// Consumers must go through `get`/`get_mut`, which check the kind tag
/// before touching the payload.
pub struct OpaqueHandle {
    kind: HandleKind,
    payload: Option<Box<dyn Any + Send>>,
    destructor: fn(Box<dyn Any + Send>),
}

fn destroy_payload<P: HandlePayload>(payload: Box<dyn Any + Send>) {
    if let Ok(payload) = payload.downcast::<P>() {
        P::release(*payload);
    }
}

impl OpaqueHandle {
    pub fn new<P: HandlePayload>(payload: P) -> Self {
        tracing::debug!(kind = %P::KIND, "opaque handle created");
        Self {
            kind: P::KIND,
            payload: Some(Box::new(payload)),
            destructor: destroy_payload::<P>,
        }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn is_destroyed(&self) -> bool {
        self.payload.is_none()
    }

    fn check_kind<P: HandlePayload>(&self) -> Result<(), HandleError> {
        if self.kind != P::KIND {
            return Err(HandleError::KindMismatch {
                expected: P::KIND.name(),
                found: self.kind.name(),
            });
        }
        Ok(())
    }

    pub fn get<P: HandlePayload>(&self) -> Result<&P, HandleError> {
        self.check_kind::<P>()?;
        let payload = self.payload.as_ref().ok_or(HandleError::Destroyed {
            kind: self.kind.name(),
        })?;
        payload.downcast_ref::<P>().ok_or(HandleError::KindMismatch {
            expected: P::KIND.name(),
            found: self.kind.name(),
        })
    }

    pub fn get_mut<P: HandlePayload>(&mut self) -> Result<&mut P, HandleError> {
        self.check_kind::<P>()?;
        let kind = self.kind.name();
        let payload = self
            .payload
            .as_mut()
            .ok_or(HandleError::Destroyed { kind })?;
        payload.downcast_mut::<P>().ok_or(HandleError::KindMismatch {
            expected: P::KIND.name(),
            found: kind,
        })
    }

    /// Run the destructor. A second call fails with `Destroyed`.
    pub fn destroy(&mut self) -> Result<(), HandleError> {
        let payload = self.payload.take().ok_or(HandleError::Destroyed {
            kind: self.kind.name(),
        })?;
        (self.destructor)(payload);
        tracing::debug!(kind = %self.kind, "opaque handle destroyed");
        Ok(())
    }
}

impl Drop for OpaqueHandle {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.take() {
            (self.destructor)(payload);
        }
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueHandle")
            .field("kind", &self.kind)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
