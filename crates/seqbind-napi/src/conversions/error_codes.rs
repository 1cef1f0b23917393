//! seqbind errors → napi::Error with structured `[ERROR_CODE] message` strings.
//!
//! The JS side reads the code from the message prefix.

use napi::Status;
use seqbind_core::errors::SeqbindErrorCode;

pub use seqbind_core::errors::error_code::{
    CANCELLED, CONFIG_ERROR, FILE_ERROR, INVALID_ARGUMENT, INVALID_HANDLE, INVALID_READ_PAIR,
    INVALID_STREAM, NATIVE_COMPUTATION_FAILURE, RESOURCE_BUSY, STREAM_READ_ERROR,
    UNKNOWN_PAIRING_MODE,
};

// Lifecycle
pub const ALREADY_INITIALIZED: &str = "ALREADY_INITIALIZED";
pub const RUNTIME_NOT_INITIALIZED: &str = "RUNTIME_NOT_INITIALIZED";

// General
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Convert any seqbind error to a structured NAPI error.
///
/// Output format: `[ERROR_CODE] Human-readable message`
pub fn to_napi_error(err: impl std::fmt::Display + SeqbindErrorCode) -> napi::Error {
    napi::Error::new(Status::GenericFailure, err.host_string())
}

pub fn invalid_argument(msg: impl std::fmt::Display) -> napi::Error {
    napi::Error::new(Status::InvalidArg, format!("[{INVALID_ARGUMENT}] {msg}"))
}

pub fn runtime_not_initialized() -> napi::Error {
    napi::Error::new(
        Status::GenericFailure,
        format!(
            "[{RUNTIME_NOT_INITIALIZED}] seqbind runtime not initialized. \
             Call initialize() first."
        ),
    )
}

pub fn internal_error(msg: impl std::fmt::Display) -> napi::Error {
    napi::Error::new(Status::GenericFailure, format!("[{INTERNAL_ERROR}] {msg}"))
}

/// Extract the code from a `[CODE] message` string.
pub fn code_of(message: &str) -> Option<&str> {
    let rest = message.strip_prefix('[')?;
    rest.find(']').map(|end| &rest[..end])
}
