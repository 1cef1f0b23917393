//! Engine operation errors.

use std::path::PathBuf;

use super::error_code::{self, SeqbindErrorCode};
use super::{HandleError, ParseError};

/// Errors surfaced by engine operations.
///
/// `Cancelled` and `Stream` carry the progress reached before the failure so
/// the host can report how far a file-scale operation got.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{operation} cancelled after {records} records ({units} units): {reason}")]
    Cancelled {
        operation: String,
        records: u64,
        units: u64,
        reason: String,
    },

    #[error("{operation} failed, {records} records consumed before failure: {source}")]
    Stream {
        operation: String,
        records: u64,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("File error on {path}: {message}")]
    File { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Native computation failure: {0}")]
    Computation(String),

    #[error("{resource} is busy with another operation")]
    Busy { resource: String },
}

impl EngineError {
    /// Build a `File` error from any displayable cause.
    pub fn file(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::File {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Returns true if this failure was requested by the host rather than
    /// raised by the computation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Build a `Busy` error for `resource`.
    pub fn busy(resource: impl Into<String>) -> Self {
        Self::Busy {
            resource: resource.into(),
        }
    }

    /// Records processed before the failure, when the operation tracked them.
    pub fn records_processed(&self) -> Option<u64> {
        match self {
            Self::Cancelled { records, .. } | Self::Stream { records, .. } => Some(*records),
            _ => None,
        }
    }
}

impl SeqbindErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => error_code::CANCELLED,
            Self::Stream { source, .. } => source.error_code(),
            Self::Parse(e) => e.error_code(),
            Self::Handle(e) => e.error_code(),
            Self::File { .. } => error_code::FILE_ERROR,
            Self::InvalidArgument(_) => error_code::INVALID_ARGUMENT,
            Self::Computation(_) => error_code::NATIVE_COMPUTATION_FAILURE,
            Self::Busy { .. } => error_code::RESOURCE_BUSY,
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
