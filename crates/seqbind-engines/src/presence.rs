//! Presence engine and the presence operation set.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::{PartitionConfig, SeqbindConfig};
use seqbind_core::constants::DEFAULT_REPORT_INTERVAL;
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::handle::OpaqueHandle;
use seqbind_core::stream::{write_record, StreamingParser};
use seqbind_core::types::{KmerHash, PartitionId};

use crate::driver::{consume_records, ConsumeStats};
use crate::graph::{
    PartitionFlags, PartitionOutput, PrePartitionInfo, SubsetPartition, TagGraph,
};
use crate::kmer::{check_ksize, forward_hash, reverse_hash, Kmer, KmerIterator};
use crate::persist;
use crate::table::{BitTable, KmerTable};

const PRESENCE_TABLE_FORMAT: &str = "seqbind-presence-table";

/// Operations of a presence engine. The labeling engine exposes the same
/// set by forwarding to its core.
pub trait PresenceOps {
    fn ksize(&self) -> u32;
    fn hashsizes(&self) -> Vec<u64>;

    /// Count every k-mer of `seq`. Returns the number of k-mers.
    fn consume(&mut self, seq: &str) -> u64;
    fn count(&mut self, kmer: &str) -> EngineResult<()>;
    fn get(&self, kmer: &str) -> EngineResult<u32>;
    fn get_hash(&self, hash: KmerHash) -> u32;
    fn n_unique_kmers(&self) -> u64;
    fn n_occupied(&self) -> u64;

    fn n_tags(&self) -> usize;
    fn add_tag(&mut self, kmer: &str) -> EngineResult<()>;
    fn add_stop_tag(&mut self, kmer: &str) -> EngineResult<()>;
    fn get_tagset(&self) -> EngineResult<Vec<String>>;
    fn get_stop_tags(&self) -> EngineResult<Vec<String>>;
    fn tag_density(&self) -> u32;
    fn set_tag_density(&mut self, density: u32);
    fn consume_and_tag(&mut self, seq: &str) -> u64;

    fn consume_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats>;
    fn consume_file_and_tag(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats>;
    /// Write records with no k-mer present in the table to `out`.
    /// `units` of the result counts the records written.
    fn filter_if_present(
        &mut self,
        parser: &mut StreamingParser,
        out: &Path,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats>;

    /// Prefix of `seq` before its first stop-tagged k-mer, and its length.
    fn trim_on_stoptags(&self, seq: &str) -> (String, usize);
    fn consume_file_and_tag_with_stoptags(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats>;
    /// Consume records whose headers end in `\t<partition id>`, restoring
    /// their tags and partitions.
    fn consume_partitioned_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats>;
    /// Write each record with the partition of its first partitioned tag
    /// appended to its header.
    fn output_partitions(
        &self,
        parser: &mut StreamingParser,
        out: &Path,
        output_unassigned: bool,
        bridge: &CancellationBridge,
    ) -> EngineResult<PartitionOutput>;

    fn find_all_tags(&self, kmer: &str) -> EngineResult<OpaqueHandle>;
    fn assign_partition_id(&mut self, info: &OpaqueHandle) -> EngineResult<PartitionId>;
    fn do_subset_partition(
        &self,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<OpaqueHandle>;
    fn merge_subset(&mut self, subset: &OpaqueHandle) -> EngineResult<()>;
    fn merge_subset_from_disk(&mut self, path: &Path) -> EngineResult<()>;
    fn get_partition_id(&self, kmer: &str) -> EngineResult<PartitionId>;
    fn join_partitions(&mut self, a: PartitionId, b: PartitionId) -> PartitionId;
    fn count_partitions(&self) -> (u64, u64);

    fn save(&self, path: &Path) -> EngineResult<()>;
    fn load(&mut self, path: &Path) -> EngineResult<()>;
    fn save_tagset(&self, path: &Path) -> EngineResult<()>;
    fn load_tagset(&mut self, path: &Path) -> EngineResult<()>;
    fn save_stop_tags(&self, path: &Path) -> EngineResult<()>;
    fn load_stop_tags(&mut self, path: &Path) -> EngineResult<()>;
    fn save_partitionmap(&self, path: &Path) -> EngineResult<()>;
    fn load_partitionmap(&mut self, path: &Path) -> EngineResult<()>;
}

pub(crate) fn check_sizes(sizes: &[u64]) -> EngineResult<()> {
    if sizes.is_empty() || sizes.contains(&0) {
        return Err(EngineError::InvalidArgument(
            "table sizes must be non-empty and non-zero".to_string(),
        ));
    }
    Ok(())
}

/// Presence table plus its tag graph.
#[derive(Debug, Clone)]
pub struct PresenceEngine {
    table: BitTable,
    graph: TagGraph,
    report_interval: u64,
}

impl PresenceEngine {
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
            table: BitTable::new(ksize, sizes),
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

    pub fn report_interval(&self) -> u64 {
        self.report_interval
    }

    pub fn table(&self) -> &BitTable {
        &self.table
    }

    pub fn graph(&self) -> &TagGraph {
        &self.graph
    }

    fn hash(&self, kmer: &str) -> EngineResult<KmerHash> {
        forward_hash(kmer, self.table.ksize())
    }

    /// Count one k-mer by hash.
    pub fn count_hash(&mut self, hash: KmerHash) -> bool {
        self.table.count(hash)
    }

    /// `consume_and_tag` that also returns the tags the sequence touched.
    pub fn consume_and_tag_collect(&mut self, seq: &str) -> (u64, Vec<KmerHash>) {
        self.graph.consume_and_tag(&mut self.table, seq)
    }

    /// Tags within `radius` steps of any k-mer of `seq`.
    pub fn tags_near(&self, seq: &str, radius: u32) -> Vec<KmerHash> {
        let mut found = rustc_hash::FxHashSet::default();
        for kmer in KmerIterator::new(seq, self.table.ksize()) {
            found.extend(crate::graph::traversal::tags_within(
                &self.table,
                self.graph.tags(),
                kmer,
                radius,
            ));
        }
        let mut found: Vec<_> = found.into_iter().collect();
        found.sort_unstable();
        found
    }

    pub fn subset_partition(
        &self,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<SubsetPartition> {
        self.graph
            .do_subset_partition(&self.table, start, end, flags, bridge)
    }

    fn hashes_to_strings(&self, hashes: Vec<KmerHash>) -> EngineResult<Vec<String>> {
        let k = self.table.ksize();
        hashes.into_iter().map(|h| reverse_hash(h, k)).collect()
    }
}

impl PresenceOps for PresenceEngine {
    fn ksize(&self) -> u32 {
        self.table.ksize()
    }

    fn hashsizes(&self) -> Vec<u64> {
        self.table.hashsizes().to_vec()
    }

    fn consume(&mut self, seq: &str) -> u64 {
        let k = self.table.ksize();
        let mut n = 0;
        for kmer in KmerIterator::new(seq, k) {
            self.table.count(kmer.canonical());
            n += 1;
        }
        n
    }

    fn count(&mut self, kmer: &str) -> EngineResult<()> {
        let hash = self.hash(kmer)?;
        self.table.count(hash);
        Ok(())
    }

    fn get(&self, kmer: &str) -> EngineResult<u32> {
        Ok(self.table.get(self.hash(kmer)?))
    }

    fn get_hash(&self, hash: KmerHash) -> u32 {
        self.table.get(hash)
    }

    fn n_unique_kmers(&self) -> u64 {
        self.table.n_unique_kmers()
    }

    fn n_occupied(&self) -> u64 {
        self.table.n_occupied()
    }

    fn n_tags(&self) -> usize {
        self.graph.tags().len()
    }

    fn add_tag(&mut self, kmer: &str) -> EngineResult<()> {
        let hash = self.hash(kmer)?;
        self.graph.tags_mut().insert(hash);
        Ok(())
    }

    fn add_stop_tag(&mut self, kmer: &str) -> EngineResult<()> {
        let hash = self.hash(kmer)?;
        self.graph.tags_mut().insert_stop(hash);
        Ok(())
    }

    fn get_tagset(&self) -> EngineResult<Vec<String>> {
        self.hashes_to_strings(self.graph.tags().sorted())
    }

    fn get_stop_tags(&self) -> EngineResult<Vec<String>> {
        self.hashes_to_strings(self.graph.tags().sorted_stop_tags())
    }

    fn tag_density(&self) -> u32 {
        self.graph.tags().density()
    }

    fn set_tag_density(&mut self, density: u32) {
        self.graph.tags_mut().set_density(density);
    }

    fn consume_and_tag(&mut self, seq: &str) -> u64 {
        self.consume_and_tag_collect(seq).0
    }

    fn consume_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        consume_records("consume_file", parser, bridge, interval, |record| {
            Ok(self.consume(&record.sequence))
        })
    }

    fn consume_file_and_tag(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        consume_records("consume_file_and_tag", parser, bridge, interval, |record| {
            Ok(self.consume_and_tag(&record.sequence))
        })
    }

    fn filter_if_present(
        &mut self,
        parser: &mut StreamingParser,
        out: &Path,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let file = File::create(out).map_err(|e| EngineError::file(out, e))?;
        let mut writer = BufWriter::new(file);
        let k = self.table.ksize();
        let table = &self.table;

        let interval = self.report_interval;
        let result = consume_records("filter_if_present", parser, bridge, interval, |record| {
            let present = KmerIterator::new(&record.sequence, k)
                .any(|kmer| table.contains(kmer.canonical()));
            if present {
                return Ok(0);
            }
            write_record(&mut writer, record).map_err(|e| EngineError::file(out, e))?;
            Ok(1)
        });
        // Records already written stay valid when the loop is cancelled.
        writer.flush().map_err(|e| EngineError::file(out, e))?;
        result
    }

    fn trim_on_stoptags(&self, seq: &str) -> (String, usize) {
        self.graph.trim_on_stop_tags(seq)
    }

    fn consume_file_and_tag_with_stoptags(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        let operation = "consume_file_and_tag_with_stoptags";
        consume_records(operation, parser, bridge, interval, |record| {
            let (consumed, _) = self
                .graph
                .consume_and_tag_with_stop_tags(&mut self.table, &record.sequence);
            Ok(consumed)
        })
    }

    fn consume_partitioned_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.report_interval;
        self.graph
            .consume_partitioned(&mut self.table, parser, bridge, interval)
    }

    fn output_partitions(
        &self,
        parser: &mut StreamingParser,
        out: &Path,
        output_unassigned: bool,
        bridge: &CancellationBridge,
    ) -> EngineResult<PartitionOutput> {
        let interval = self.report_interval;
        self.graph
            .output_partitions(parser, out, output_unassigned, bridge, interval)
    }

    fn find_all_tags(&self, kmer: &str) -> EngineResult<OpaqueHandle> {
        let start = Kmer::parse(kmer, self.table.ksize())?;
        let info: PrePartitionInfo = self.graph.find_all_tags(&self.table, start, None);
        Ok(OpaqueHandle::new(info))
    }

    fn assign_partition_id(&mut self, info: &OpaqueHandle) -> EngineResult<PartitionId> {
        let info = info.get::<PrePartitionInfo>()?;
        Ok(self.graph.assign_partition_id(info))
    }

    fn do_subset_partition(
        &self,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<OpaqueHandle> {
        self.subset_partition(start, end, flags, bridge)
            .map(OpaqueHandle::new)
    }

    fn merge_subset(&mut self, subset: &OpaqueHandle) -> EngineResult<()> {
        let subset = subset.get::<SubsetPartition>()?;
        self.graph.merge_subset(subset)
    }

    fn merge_subset_from_disk(&mut self, path: &Path) -> EngineResult<()> {
        self.graph.merge_subset_from_disk(path)
    }

    fn get_partition_id(&self, kmer: &str) -> EngineResult<PartitionId> {
        Ok(self.graph.partition_id(self.hash(kmer)?))
    }

    fn join_partitions(&mut self, a: PartitionId, b: PartitionId) -> PartitionId {
        self.graph.join_partitions(a, b)
    }

    fn count_partitions(&self) -> (u64, u64) {
        self.graph.count_partitions()
    }

    fn save(&self, path: &Path) -> EngineResult<()> {
        persist::save(path, PRESENCE_TABLE_FORMAT, &self.table)
    }

    fn load(&mut self, path: &Path) -> EngineResult<()> {
        let table: BitTable = persist::load(path, PRESENCE_TABLE_FORMAT)?;
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

    fn save_tagset(&self, path: &Path) -> EngineResult<()> {
        self.graph.save_tagset(path)
    }

    fn load_tagset(&mut self, path: &Path) -> EngineResult<()> {
        self.graph.load_tagset(path)
    }

    fn save_stop_tags(&self, path: &Path) -> EngineResult<()> {
        self.graph.save_stop_tags(path)
    }

    fn load_stop_tags(&mut self, path: &Path) -> EngineResult<()> {
        self.graph.load_stop_tags(path)
    }

    fn save_partitionmap(&self, path: &Path) -> EngineResult<()> {
        self.graph.save_partitionmap(path)
    }

    fn load_partitionmap(&mut self, path: &Path) -> EngineResult<()> {
        self.graph.load_partitionmap(path)
    }
}

/// Partition the engine's tags in `shards` disjoint hash ranges
/// concurrently. Returns one subset handle per shard, in range order.
pub fn partition_in_shards(
    engine: &PresenceEngine,
    shards: usize,
    flags: PartitionFlags,
    bridge: &CancellationBridge,
) -> EngineResult<Vec<OpaqueHandle>> {
    let tags = engine.graph().tags().sorted();
    let shards = shards.max(1);
    let chunk = tags.len().div_ceil(shards).max(1);

    // Range i covers [bounds[i], bounds[i + 1]); the last range is open.
    let mut bounds: Vec<KmerHash> = tags.iter().step_by(chunk).copied().collect();
    if bounds.is_empty() {
        bounds.push(0);
    }
    bounds[0] = 0;
    let ranges: Vec<(KmerHash, KmerHash)> = bounds
        .iter()
        .enumerate()
        .map(|(i, &start)| (start, bounds.get(i + 1).copied().unwrap_or(0)))
        .collect();

    tracing::info!(shards = ranges.len(), tags = tags.len(), "sharded partition started");

    ranges
        .into_par_iter()
        .map(|(start, end)| {
            engine
                .subset_partition(start, end, flags, bridge)
                .map(OpaqueHandle::new)
        })
        .collect()
}
