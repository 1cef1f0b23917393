//! Shared constants for seqbind.

/// seqbind version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest k-mer size that fits a 2-bit packed `u64`.
pub const MAX_KSIZE: u32 = 32;

/// Default k-mer size.
pub const DEFAULT_KSIZE: u32 = 20;

/// Default number of hash tables per engine.
pub const DEFAULT_N_TABLES: u32 = 4;

/// Default size of each hash table (entries).
pub const DEFAULT_TABLE_SIZE: u64 = 1_000_003;

/// Default number of records between progress reports.
pub const DEFAULT_REPORT_INTERVAL: u64 = 100_000;

/// Default tagging density (one tag every N k-mers).
pub const DEFAULT_TAG_DENSITY: u32 = 40;

/// Default traversal size above which "big" traversals are abandoned.
pub const DEFAULT_TRAVERSAL_LIMIT: u64 = 200;

/// Default trusted coverage cutoff for the read aligner.
pub const DEFAULT_TRUSTED_CUTOFF: u32 = 2;

/// Saturation value of a non-bigcount counter.
pub const MAX_COUNT: u32 = 255;

/// Saturation value of a bigcount counter.
pub const MAX_BIGCOUNT: u32 = 65_535;
