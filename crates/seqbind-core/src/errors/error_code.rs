//! SeqbindErrorCode trait for host-boundary conversion.

/// Trait for converting seqbind errors to host error codes.
/// Every error enum implements this so the host surface can tell failure
/// kinds apart without parsing messages.
pub trait SeqbindErrorCode {
    /// Returns the error code string (e.g., "CANCELLED").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted host error string: `[ERROR_CODE] message`.
    fn host_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Error code constants for the host boundary.
pub const INVALID_STREAM: &str = "INVALID_STREAM";
pub const STREAM_READ_ERROR: &str = "STREAM_READ_ERROR";
pub const UNKNOWN_PAIRING_MODE: &str = "UNKNOWN_PAIRING_MODE";
pub const INVALID_READ_PAIR: &str = "INVALID_READ_PAIR";
pub const CANCELLED: &str = "CANCELLED";
pub const INVALID_HANDLE: &str = "INVALID_HANDLE";
pub const NATIVE_COMPUTATION_FAILURE: &str = "NATIVE_COMPUTATION_FAILURE";
pub const FILE_ERROR: &str = "FILE_ERROR";
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const RESOURCE_BUSY: &str = "RESOURCE_BUSY";
