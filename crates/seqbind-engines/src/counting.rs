//! Counting engine.

use std::path::Path;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::{PartitionConfig, SeqbindConfig};
use seqbind_core::constants::{DEFAULT_REPORT_INTERVAL, MAX_BIGCOUNT, MAX_COUNT};
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::handle::OpaqueHandle;
use seqbind_core::stream::StreamingParser;
use seqbind_core::types::{KmerHash, PartitionId};

use crate::driver::{consume_records, ConsumeStats};
use crate::graph::{PartitionFlags, PrePartitionInfo, SubsetPartition, TagGraph};
use crate::kmer::{check_ksize, forward_hash, Kmer, KmerIterator};
use crate::persist;
use crate::presence::{check_sizes, PresenceEngine, PresenceOps};
use crate::table::{CountTable, KmerTable};

const COUNTING_TABLE_FORMAT: &str = "seqbind-counting-table";

/// Summary of k-mer counts along one sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianCount {
    pub median: u32,
    pub average: f64,
    pub stddev: f64,
}

/// Count-min table plus its tag graph.
#[derive(Debug, Clone)]
pub struct CountingEngine {
    table: CountTable,
    graph: TagGraph,
    report_interval: u64,
}

impl CountingEngine {
    pub fn new(ksize: u32, sizes: &[u64]) -> EngineResult<Self> {
        Self::with_partition_config(ksize, sizes, &PartitionConfig::default())
    }

    pub fn with_partition_config(
        ksize: u32,
        sizes: &[u64],
        partition: &PartitionConfig,
    ) -> EngineResult<Self> {
        check_ksize(ksize)?;
        check_sizes(sizes)?;
        Ok(Self {
            table: CountTable::new(ksize, sizes),
            graph: TagGraph::new(ksize, partition),
            report_interval: DEFAULT_REPORT_INTERVAL,
        })
    }

    pub fn from_config(config: &SeqbindConfig) -> EngineResult<Self> {
        let engine = Self::with_partition_config(
            config.tables.effective_ksize(),
            &config.tables.table_sizes(),
            &config.partition,
        )?;
        Ok(engine.with_report_interval(config.progress.effective_report_interval()))
    }

    pub fn with_report_interval(mut self, interval: u64) -> Self {
        self.report_interval = interval.max(1);
        self
    }

    pub fn table(&self) -> &CountTable {
        &self.table
    }

    pub fn ksize(&self) -> u32 {
        self.table.ksize()
    }

    pub fn hashsizes(&self) -> Vec<u64> {
        self.table.hashsizes().to_vec()
    }

    pub fn set_use_bigcount(&mut self, enabled: bool) {
        self.table.set_use_bigcount(enabled);
    }

    pub fn get_use_bigcount(&self) -> bool {
        self.table.use_bigcount()
    }

    fn hash(&self, kmer: &str) -> EngineResult<KmerHash> {
        forward_hash(kmer, self.table.ksize())
    }

    pub fn consume(&mut self, seq: &str) -> u64 {
        let k = self.table.ksize();
        let mut n = 0;
        for kmer in KmerIterator::new(seq, k) {
            self.table.count(kmer.canonical());
            n += 1;
        }
        n
    }

    pub fn count(&mut self, kmer: &str) -> EngineResult<()> {
        let hash = self.hash(kmer)?;
        self.table.count(hash);
        Ok(())
    }

    pub fn get(&self, kmer: &str) -> EngineResult<u32> {
        Ok(self.table.get(self.hash(kmer)?))
    }

    pub fn get_hash(&self, hash: KmerHash) -> u32 {
        self.table.get(hash)
    }

    fn counts_along(&self, seq: &str) -> EngineResult<Vec<u32>> {
        let counts: Vec<u32> = KmerIterator::new(seq, self.table.ksize())
            .map(|kmer| self.table.get(kmer.canonical()))
            .collect();
        if counts.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "sequence has no valid k-mers of size {}",
                self.table.ksize()
            )));
        }
        Ok(counts)
    }

    pub fn get_min_count(&self, seq: &str) -> EngineResult<u32> {
        Ok(self.counts_along(seq)?.into_iter().min().unwrap_or(0))
    }

    pub fn get_max_count(&self, seq: &str) -> EngineResult<u32> {
        Ok(self.counts_along(seq)?.into_iter().max().unwrap_or(0))
    }

    pub fn get_median_count(&self, seq: &str) -> EngineResult<MedianCount> {
        let mut counts = self.counts_along(seq)?;
        let n = counts.len() as f64;
        let average = counts.iter().map(|&c| f64::from(c)).sum::<f64>() / n;
        let variance = counts
            .iter()
            .map(|&c| (f64::from(c) - average).powi(2))
            .sum::<f64>()
            / n;
        counts.sort_unstable();
        Ok(MedianCount {
            median: counts[counts.len() / 2],
            average,
            stddev: variance.sqrt(),
        })
    }

    pub fn n_unique_kmers(&self) -> u64 {
        self.table.n_unique_kmers()
    }

    pub fn n_occupied(&self) -> u64 {
        self.table.n_occupied()
    }

    pub fn consume_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        consume_records("consume_file", parser, bridge, interval, |record| {
            Ok(self.consume(&record.sequence))
        })
    }

    /// Histogram of counts over the distinct k-mers of a file. `tracking`
    /// records which k-mers were already seen and must share this engine's
    /// k-mer size.
    pub fn abundance_distribution(
        &self,
        parser: &mut StreamingParser,
        tracking: &mut PresenceEngine,
        bridge: &CancellationBridge,
    ) -> EngineResult<Vec<u64>> {
        let k = self.table.ksize();
        if tracking.ksize() != k {
            return Err(EngineError::InvalidArgument(format!(
                "tracking table k-mer size {} does not match {k}",
                tracking.ksize()
            )));
        }
        let max = if self.table.use_bigcount() {
            MAX_BIGCOUNT
        } else {
            MAX_COUNT
        };
        let mut histogram = vec![0u64; max as usize + 1];
        let table = &self.table;

        consume_records(
            "abundance_distribution",
            parser,
            bridge,
            self.report_interval,
            |record| {
                let mut new = 0;
                for kmer in KmerIterator::new(&record.sequence, k) {
                    let hash = kmer.canonical();
                    if tracking.get_hash(hash) == 0 {
                        tracking.count_hash(hash);
                        let count = table.get(hash).min(max) as usize;
                        histogram[count] += 1;
                        new += 1;
                    }
                }
                Ok(new)
            },
        )?;
        Ok(histogram)
    }

    /// Trim `seq` at the first k-mer whose count is below `min`. Returns the
    /// kept prefix and its length.
    pub fn trim_on_abundance(&self, seq: &str, min: u32) -> (String, usize) {
        let k = self.table.ksize() as usize;
        let bytes = seq.as_bytes();
        for (i, window) in bytes.windows(k).enumerate() {
            let count = std::str::from_utf8(window)
                .ok()
                .and_then(|w| forward_hash(w, k as u32).ok())
                .map(|h| self.table.get(h))
                .unwrap_or(0);
            if count < min {
                let keep = if i == 0 { 0 } else { i + k - 1 };
                return (String::from_utf8_lossy(&bytes[..keep]).into_owned(), keep);
            }
        }
        (seq.to_string(), seq.len())
    }

    pub fn consume_and_tag(&mut self, seq: &str) -> u64 {
        self.graph.consume_and_tag(&mut self.table, seq).0
    }

    pub fn find_all_tags_truncate_on_abundance(
        &self,
        kmer: &str,
        min: u32,
        max: u32,
    ) -> EngineResult<OpaqueHandle> {
        let start = Kmer::parse(kmer, self.table.ksize())?;
        let info: PrePartitionInfo =
            self.graph
                .find_all_tags(&self.table, start, Some((min, max)));
        Ok(OpaqueHandle::new(info))
    }

    pub fn assign_partition_id(&mut self, info: &OpaqueHandle) -> EngineResult<PartitionId> {
        let info = info.get::<PrePartitionInfo>()?;
        Ok(self.graph.assign_partition_id(info))
    }

    pub fn do_subset_partition_with_abundance(
        &self,
        min: u32,
        max: u32,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<OpaqueHandle> {
        let flags = PartitionFlags {
            abundance: Some((min, max)),
            ..flags
        };
        let subset: SubsetPartition =
            self.graph
                .do_subset_partition(&self.table, start, end, flags, bridge)?;
        Ok(OpaqueHandle::new(subset))
    }

    pub fn merge_subset(&mut self, subset: &OpaqueHandle) -> EngineResult<()> {
        let subset = subset.get::<SubsetPartition>()?;
        self.graph.merge_subset(subset)
    }

    pub fn merge_subset_from_disk(&mut self, path: &Path) -> EngineResult<()> {
        self.graph.merge_subset_from_disk(path)
    }

    pub fn get_partition_id(&self, kmer: &str) -> EngineResult<PartitionId> {
        Ok(self.graph.partition_id(self.hash(kmer)?))
    }

    pub fn count_partitions(&self) -> (u64, u64) {
        self.graph.count_partitions()
    }

    pub fn n_tags(&self) -> usize {
        self.graph.tags().len()
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        persist::save(path, COUNTING_TABLE_FORMAT, &self.table)
    }

    pub fn load(&mut self, path: &Path) -> EngineResult<()> {
        let table: CountTable = persist::load(path, COUNTING_TABLE_FORMAT)?;
        if table.ksize() != self.table.ksize() {
            return Err(EngineError::file(
                path,
                format!(
                    "table k-mer size {} does not match engine k-mer size {}",
                    table.ksize(),
                    self.table.ksize()
                ),
            ));
        }
        self.table = table;
        Ok(())
    }
}
