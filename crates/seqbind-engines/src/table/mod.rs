//! K-mer tables behind the counting and presence engines.

pub mod counts;
pub mod presence;

pub use counts::CountTable;
pub use presence::BitTable;

use seqbind_core::types::KmerHash;

/// A multi-table hash structure keyed by canonical k-mer hash.
pub trait KmerTable: Send + Sync {
    fn ksize(&self) -> u32;

    fn hashsizes(&self) -> &[u64];

    /// Record one occurrence. Returns true if the k-mer was not seen before.
    fn count(&mut self, hash: KmerHash) -> bool;

    fn get(&self, hash: KmerHash) -> u32;

    fn n_unique_kmers(&self) -> u64;

    /// Occupied entries in the first table.
    fn n_occupied(&self) -> u64;

    fn contains(&self, hash: KmerHash) -> bool {
        self.get(hash) > 0
    }
}
