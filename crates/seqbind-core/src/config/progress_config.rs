//! Progress reporting configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_REPORT_INTERVAL;

/// How often long-running operations call the cancellation bridge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProgressConfig {
    /// Records between progress reports. Default: 100_000.
    pub report_interval: Option<u64>,
}

impl ProgressConfig {
    /// Returns the effective report interval, defaulting to 100_000.
    pub fn effective_report_interval(&self) -> u64 {
        self.report_interval.unwrap_or(DEFAULT_REPORT_INTERVAL)
    }
}
