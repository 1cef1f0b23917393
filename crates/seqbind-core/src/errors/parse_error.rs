//! Record stream errors.

use std::path::PathBuf;

use super::error_code::{self, SeqbindErrorCode};

/// Errors raised while opening or pulling from a record stream.
///
/// End of stream is not represented here: iteration reports it as `None`.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Cannot open {path} as a sequence stream: {message}")]
    InvalidStream { path: PathBuf, message: String },

    #[error("Malformed record after {records_read} records: {message}")]
    StreamRead { records_read: u64, message: String },

    #[error("IO error after {records_read} records: {source}")]
    Io {
        records_read: u64,
        source: std::io::Error,
    },

    #[error("Unknown pair reading mode: {mode}")]
    UnknownPairingMode { mode: String },

    #[error("Invalid read pair: {first} / {second}")]
    InvalidReadPair { first: String, second: String },

    #[error("Parser is busy with another consumer")]
    Busy,
}

impl ParseError {
    /// Build a `StreamRead` error.
    pub fn stream_read(records_read: u64, message: impl Into<String>) -> Self {
        Self::StreamRead {
            records_read,
            message: message.into(),
        }
    }
}

impl SeqbindErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidStream { .. } => error_code::INVALID_STREAM,
            Self::StreamRead { .. } | Self::Io { .. } => error_code::STREAM_READ_ERROR,
            Self::Busy => error_code::RESOURCE_BUSY,
            Self::UnknownPairingMode { .. } => error_code::UNKNOWN_PAIRING_MODE,
            Self::InvalidReadPair { .. } => error_code::INVALID_READ_PAIR,
        }
    }
}
