//! Hash table configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_KSIZE, DEFAULT_N_TABLES, DEFAULT_TABLE_SIZE};

/// Default shape of counting and presence tables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TableConfig {
    /// K-mer size. Default: 20.
    pub ksize: Option<u32>,
    /// Number of hash tables. Default: 4.
    pub n_tables: Option<u32>,
    /// Entries per table. Default: 1_000_003.
    pub table_size: Option<u64>,
}

impl TableConfig {
    /// Returns the effective k-mer size, defaulting to 20.
    pub fn effective_ksize(&self) -> u32 {
        self.ksize.unwrap_or(DEFAULT_KSIZE)
    }

    /// Returns the effective table count, defaulting to 4.
    pub fn effective_n_tables(&self) -> u32 {
        self.n_tables.unwrap_or(DEFAULT_N_TABLES)
    }

    /// Returns the effective table size, defaulting to 1_000_003.
    pub fn effective_table_size(&self) -> u64 {
        self.table_size.unwrap_or(DEFAULT_TABLE_SIZE)
    }

    /// Table sizes for a new engine: `n_tables` distinct odd sizes, counting
    /// down from `table_size` and continuing above it once 3 is reached, so
    /// the tables hash independently.
    pub fn table_sizes(&self) -> Vec<u64> {
        let base = self.effective_table_size().max(3);
        let start = if base % 2 == 0 { base - 1 } else { base };
        let below = (0..=(start - 3) / 2).map(|i| start - 2 * i);
        let above = (1..).map(|i| start.saturating_add(2 * i));
        below
            .chain(above)
            .take(self.effective_n_tables() as usize)
            .collect()
    }
}
