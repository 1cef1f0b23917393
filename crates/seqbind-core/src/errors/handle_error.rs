//! Opaque and engine handle errors.

use super::error_code::{self, SeqbindErrorCode};

/// Errors from handle validation. Every variant maps to `INVALID_HANDLE`.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Handle kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Handle {kind} has already been destroyed")]
    Destroyed { kind: &'static str },

    #[error("Unknown or stale handle id {id}")]
    Stale { id: String },
}

impl SeqbindErrorCode for HandleError {
    fn error_code(&self) -> &'static str {
        error_code::INVALID_HANDLE
    }
}
