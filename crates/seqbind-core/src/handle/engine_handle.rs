//! Exclusive ownership of one engine instance.

use crate::errors::HandleError;

/// Owns one engine. `release` destroys it exactly once; any access after
/// that fails with `InvalidHandle` instead of touching freed state. An
/// unreleased engine is dropped with the handle.
#[derive(Debug)]
pub struct EngineHandle<E> {
    kind: &'static str,
    engine: Option<E>,
}

impl<E> EngineHandle<E> {
    pub fn new(kind: &'static str, engine: E) -> Self {
        tracing::debug!(kind, "engine handle created");
        Self {
            kind,
            engine: Some(engine),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn get(&self) -> Result<&E, HandleError> {
        self.engine
            .as_ref()
            .ok_or(HandleError::Destroyed { kind: self.kind })
    }

    pub fn get_mut(&mut self) -> Result<&mut E, HandleError> {
        let kind = self.kind;
        self.engine.as_mut().ok_or(HandleError::Destroyed { kind })
    }

    pub fn release(&mut self) -> Result<(), HandleError> {
        let engine = self
            .engine
            .take()
            .ok_or(HandleError::Destroyed { kind: self.kind })?;
        drop(engine);
        tracing::debug!(kind = self.kind, "engine handle released");
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }
}
