//! Error handling for seqbind.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod engine_error;
pub mod error_code;
pub mod handle_error;
pub mod parse_error;

pub use config_error::ConfigError;
pub use engine_error::{EngineError, EngineResult};
pub use error_code::SeqbindErrorCode;
pub use handle_error::HandleError;
pub use parse_error::ParseError;
