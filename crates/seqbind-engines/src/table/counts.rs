//! Count-min table with optional big counts.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use seqbind_core::constants::{MAX_BIGCOUNT, MAX_COUNT};
use seqbind_core::types::KmerHash;

use super::KmerTable;

/// Byte counters per table; the count of a k-mer is the minimum over its
/// bins. With big counts enabled, k-mers that saturate every bin keep
/// counting in a side map up to 65535.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTable {
    ksize: u32,
    sizes: Vec<u64>,
    counts: Vec<Vec<u8>>,
    bigcounts: FxHashMap<KmerHash, u16>,
    use_bigcount: bool,
    n_unique: u64,
    occupied: u64,
}

impl CountTable {
    pub fn new(ksize: u32, sizes: &[u64]) -> Self {
        let counts = sizes.iter().map(|&size| vec![0u8; size as usize]).collect();
        Self {
            ksize,
            sizes: sizes.to_vec(),
            counts,
            bigcounts: FxHashMap::default(),
            use_bigcount: false,
            n_unique: 0,
            occupied: 0,
        }
    }

    pub fn use_bigcount(&self) -> bool {
        self.use_bigcount
    }

    pub fn set_use_bigcount(&mut self, enabled: bool) {
        self.use_bigcount = enabled;
    }

    fn min_bin(&self, hash: KmerHash) -> u32 {
        self.sizes
            .iter()
            .zip(&self.counts)
            .map(|(&size, table)| u32::from(table[(hash % size) as usize]))
            .min()
            .unwrap_or(0)
    }
}

impl KmerTable for CountTable {
    fn ksize(&self) -> u32 {
        self.ksize
    }

    fn hashsizes(&self) -> &[u64] {
        &self.sizes
    }

    fn count(&mut self, hash: KmerHash) -> bool {
        let before = self.min_bin(hash);
        for (i, (&size, table)) in self.sizes.iter().zip(self.counts.iter_mut()).enumerate() {
            let bin = &mut table[(hash % size) as usize];
            if *bin == 0 && i == 0 {
                self.occupied += 1;
            }
            *bin = bin.saturating_add(1);
        }
        if before >= MAX_COUNT && self.use_bigcount {
            let big = self.bigcounts.entry(hash).or_insert(MAX_COUNT as u16);
            if u32::from(*big) < MAX_BIGCOUNT {
                *big += 1;
            }
        }
        if before == 0 {
            self.n_unique += 1;
        }
        before == 0
    }

    fn get(&self, hash: KmerHash) -> u32 {
        let count = self.min_bin(hash);
        if count >= MAX_COUNT && self.use_bigcount {
            if let Some(&big) = self.bigcounts.get(&hash) {
                return u32::from(big);
            }
        }
        count
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique
    }

    fn n_occupied(&self) -> u64 {
        self.occupied
    }
}
