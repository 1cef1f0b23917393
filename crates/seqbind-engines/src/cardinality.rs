//! HyperLogLog cardinality estimation over canonical k-mers.

use xxhash_rust::xxh3::xxh3_64;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::constants::DEFAULT_REPORT_INTERVAL;
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::stream::StreamingParser;

use crate::driver::{consume_records, ConsumeStats};
use crate::kmer::{check_ksize, forward_hash, KmerIterator};

const MIN_PRECISION: u32 = 4;
const MAX_PRECISION: u32 = 18;

/// HyperLogLog counter sized from a target relative error.
#[derive(Debug, Clone)]
pub struct HllCounter {
    ksize: u32,
    precision: u32,
    registers: Vec<u8>,
    report_interval: u64,
}

impl HllCounter {
    /// `error_rate` must lie strictly between 0 and 1.
    pub fn new(error_rate: f64, ksize: u32) -> EngineResult<Self> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(EngineError::InvalidArgument(format!(
                "error rate {error_rate} must be between 0 and 1"
            )));
        }
        check_ksize(ksize)?;
        let wanted = ((1.04 / error_rate).powi(2)).log2().ceil() as u32;
        let precision = wanted.clamp(MIN_PRECISION, MAX_PRECISION);
        Ok(Self {
            ksize,
            precision,
            registers: vec![0; 1 << precision],
            report_interval: DEFAULT_REPORT_INTERVAL,
        })
    }

    pub fn with_report_interval(mut self, interval: u64) -> Self {
        self.report_interval = interval.max(1);
        self
    }

    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Relative standard error of the estimate.
    pub fn error_rate(&self) -> f64 {
        1.04 / (self.registers.len() as f64).sqrt()
    }

    fn add_canonical(&mut self, hash: u64) {
        let h = xxh3_64(&hash.to_le_bytes());
        let index = (h >> (64 - self.precision)) as usize;
        let rest = h << self.precision;
        let rank = (rest.leading_zeros() + 1).min(64 - self.precision + 1) as u8;
        if rank > self.registers[index] {
            self.registers[index] = rank;
        }
    }

    pub fn add(&mut self, kmer: &str) -> EngineResult<()> {
        let hash = forward_hash(kmer, self.ksize)?;
        self.add_canonical(hash);
        Ok(())
    }

    /// Add every k-mer of `seq`. Returns the number added.
    pub fn consume_string(&mut self, seq: &str) -> u64 {
        let mut n = 0;
        for kmer in KmerIterator::new(seq, self.ksize) {
            self.add_canonical(kmer.canonical());
            n += 1;
        }
        n
    }

    pub fn consume_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        consume_records("hll_consume_file", parser, bridge, interval, |record| {
            Ok(self.consume_string(&record.sequence))
        })
    }

    pub fn estimate_cardinality(&self) -> u64 {
        let m = self.registers.len() as f64;
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        };
        let sum: f64 = self
            .registers
            .iter()
            .map(|&r| 2f64.powi(-i32::from(r)))
            .sum();
        let raw = alpha * m * m / sum;

        let zeros = self.registers.iter().filter(|&&r| r == 0).count();
        let estimate = if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        };
        estimate.round() as u64
    }

    /// Fold `other` in. Both counters must share precision and k-mer size.
    pub fn merge(&mut self, other: &HllCounter) -> EngineResult<()> {
        if other.precision != self.precision || other.ksize != self.ksize {
            return Err(EngineError::InvalidArgument(
                "HyperLogLog counters differ in precision or k-mer size".to_string(),
            ));
        }
        for (mine, theirs) in self.registers.iter_mut().zip(&other.registers) {
            *mine = (*mine).max(*theirs);
        }
        Ok(())
    }
}
