//! Pair reading policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// How a pair iterator treats records without a mate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Yield the record with a placeholder mate.
    AllowUnpaired,
    /// Drop it and keep looking for a pair.
    IgnoreUnpaired,
    /// Fail with `InvalidReadPair`.
    ErrorOnUnpaired,
}

impl PairingPolicy {
    pub const ALLOW_UNPAIRED: i32 = 0;
    pub const IGNORE_UNPAIRED: i32 = 1;
    pub const ERROR_ON_UNPAIRED: i32 = 2;

    /// Resolve a numeric host code.
    pub fn from_code(code: i64) -> Result<Self, ParseError> {
        match code {
            0 => Ok(Self::AllowUnpaired),
            1 => Ok(Self::IgnoreUnpaired),
            2 => Ok(Self::ErrorOnUnpaired),
            other => Err(ParseError::UnknownPairingMode {
                mode: other.to_string(),
            }),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::AllowUnpaired => Self::ALLOW_UNPAIRED,
            Self::IgnoreUnpaired => Self::IGNORE_UNPAIRED,
            Self::ErrorOnUnpaired => Self::ERROR_ON_UNPAIRED,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AllowUnpaired => "allow_unpaired",
            Self::IgnoreUnpaired => "ignore_unpaired",
            Self::ErrorOnUnpaired => "error_on_unpaired",
        }
    }
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self::ErrorOnUnpaired
    }
}

impl fmt::Display for PairingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PairingPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow_unpaired" => Ok(Self::AllowUnpaired),
            "ignore_unpaired" => Ok(Self::IgnoreUnpaired),
            "error_on_unpaired" => Ok(Self::ErrorOnUnpaired),
            other => Err(ParseError::UnknownPairingMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl TryFrom<i64> for PairingPolicy {
    type Error = ParseError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}
