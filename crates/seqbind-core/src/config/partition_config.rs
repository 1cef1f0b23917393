//! Tagging and partitioning configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TAG_DENSITY, DEFAULT_TRAVERSAL_LIMIT};

/// Tag graph defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PartitionConfig {
    /// One tag every N k-mers. Default: 40.
    pub tag_density: Option<u32>,
    /// Traversal size treated as "big". Default: 200.
    pub traversal_limit: Option<u64>,
    /// Abandon traversals larger than the limit. Default: false.
    pub stop_big_traversals: Option<bool>,
}

impl PartitionConfig {
    /// Returns the effective tag density, defaulting to 40.
    pub fn effective_tag_density(&self) -> u32 {
        self.tag_density.unwrap_or(DEFAULT_TAG_DENSITY)
    }

    /// Returns the effective traversal limit, defaulting to 200.
    pub fn effective_traversal_limit(&self) -> u64 {
        self.traversal_limit.unwrap_or(DEFAULT_TRAVERSAL_LIMIT)
    }

    /// Returns whether big traversals are abandoned, defaulting to false.
    pub fn effective_stop_big_traversals(&self) -> bool {
        self.stop_big_traversals.unwrap_or(false)
    }
}
