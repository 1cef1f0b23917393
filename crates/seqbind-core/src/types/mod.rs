//! Boundary data types.

pub mod pairing;
pub mod record;

pub use pairing::PairingPolicy;
pub use record::{RecordPair, SequenceRecord};

/// Canonical 2-bit packed k-mer hash (k <= 32).
pub type KmerHash = u64;

/// Partition identifier. 0 means unassigned.
pub type PartitionId = u32;

/// Label attached to tags by the labeling engine.
pub type Label = u64;
