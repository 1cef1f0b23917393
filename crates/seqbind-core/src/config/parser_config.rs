//! Record parser configuration.

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;
use crate::types::PairingPolicy;

/// Parser defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParserConfig {
    /// Pairing policy used when the caller does not name one.
    /// One of `allow_unpaired`, `ignore_unpaired`, `error_on_unpaired`.
    pub default_pairing: Option<String>,
}

impl ParserConfig {
    /// Returns the effective default pairing policy, defaulting to
    /// `ErrorOnUnpaired`.
    pub fn effective_default_pairing(&self) -> Result<PairingPolicy, ParseError> {
        match self.default_pairing.as_deref() {
            Some(name) => name.parse(),
            None => Ok(PairingPolicy::ErrorOnUnpaired),
        }
    }
}
