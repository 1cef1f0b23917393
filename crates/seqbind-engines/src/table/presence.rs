//! Bitset presence table.

use serde::{Deserialize, Serialize};

use seqbind_core::types::KmerHash;

use super::KmerTable;

/// One bitset per table size; a k-mer is present when its bit is set in
/// every table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitTable {
    ksize: u32,
    sizes: Vec<u64>,
    bits: Vec<Vec<u64>>,
    n_unique: u64,
    occupied: u64,
}

impl BitTable {
    pub fn new(ksize: u32, sizes: &[u64]) -> Self {
        let bits = sizes
            .iter()
            .map(|&size| vec![0u64; size.div_ceil(64) as usize])
            .collect();
        Self {
            ksize,
            sizes: sizes.to_vec(),
            bits,
            n_unique: 0,
            occupied: 0,
        }
    }

    #[inline]
    fn slot(size: u64, hash: KmerHash) -> (usize, u64) {
        let bin = hash % size;
        ((bin / 64) as usize, 1u64 << (bin % 64))
    }
}

impl KmerTable for BitTable {
    fn ksize(&self) -> u32 {
        self.ksize
    }

    fn hashsizes(&self) -> &[u64] {
        &self.sizes
    }

    fn count(&mut self, hash: KmerHash) -> bool {
        let mut is_new = false;
        for (i, (&size, table)) in self.sizes.iter().zip(self.bits.iter_mut()).enumerate() {
            let (word, bit) = Self::slot(size, hash);
            if table[word] & bit == 0 {
                table[word] |= bit;
                is_new = true;
                if i == 0 {
                    self.occupied += 1;
                }
            }
        }
        if is_new {
            self.n_unique += 1;
        }
        is_new
    }

    fn get(&self, hash: KmerHash) -> u32 {
        let present = self
            .sizes
            .iter()
            .zip(&self.bits)
            .all(|(&size, table)| {
                let (word, bit) = Self::slot(size, hash);
                table[word] & bit != 0
            });
        u32::from(present)
    }

    fn n_unique_kmers(&self) -> u64 {
        self.n_unique
    }

    fn n_occupied(&self) -> u64 {
        self.occupied
    }
}
