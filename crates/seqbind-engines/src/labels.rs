//! Labeling engine: a presence engine extended with tag labels.

use std::path::Path;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::SeqbindConfig;
use seqbind_core::errors::EngineResult;
use seqbind_core::handle::OpaqueHandle;
use seqbind_core::stream::StreamingParser;
use seqbind_core::types::{KmerHash, Label, PartitionId};

use crate::driver::{consume_records, ConsumeStats};
use crate::graph::{PartitionFlags, PartitionOutput};
use crate::presence::{PresenceEngine, PresenceOps};

/// Owns a presence engine and a tag-to-label index.
///
/// Every presence operation is forwarded to the core; the label operations
/// are layered on top.
#[derive(Debug, Clone)]
pub struct LabelEngine {
    core: PresenceEngine,
    tag_labels: FxHashMap<KmerHash, SmallVec<[Label; 2]>>,
    n_labels: u64,
}

impl LabelEngine {
    pub fn new(ksize: u32, sizes: &[u64]) -> EngineResult<Self> {
        Ok(Self::from_core(PresenceEngine::new(ksize, sizes)?))
    }

    pub fn from_config(config: &SeqbindConfig) -> EngineResult<Self> {
        Ok(Self::from_core(PresenceEngine::from_config(config)?))
    }

    pub fn from_core(core: PresenceEngine) -> Self {
        Self {
            core,
            tag_labels: FxHashMap::default(),
            n_labels: 0,
        }
    }

    pub fn core(&self) -> &PresenceEngine {
        &self.core
    }

    fn attach(&mut self, tag: KmerHash, label: Label) {
        let labels = self.tag_labels.entry(tag).or_default();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    fn note_label(&mut self, label: Label) {
        self.n_labels = self.n_labels.max(label + 1);
    }

    /// Consume and tag `seq`, attaching `label` to every tag it touches.
    /// Returns the k-mers consumed.
    pub fn consume_sequence_and_tag_with_labels(&mut self, seq: &str, label: Label) -> u64 {
        let (consumed, touched) = self.core.consume_and_tag_collect(seq);
        for tag in touched {
            self.attach(tag, label);
        }
        self.note_label(label);
        consumed
    }

    /// Consume a file giving each record a fresh label, starting after the
    /// labels already issued.
    pub fn consume_file_and_tag_with_labels(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        let interval = self.core.report_interval();
        consume_records(
            "consume_file_and_tag_with_labels",
            parser,
            bridge,
            interval,
            |record| {
                let label = self.n_labels;
                Ok(self.consume_sequence_and_tag_with_labels(&record.sequence, label))
            },
        )
    }

    pub fn get_tag_labels(&self, tag: KmerHash) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .tag_labels
            .get(&tag)
            .map(|l| l.to_vec())
            .unwrap_or_default();
        labels.sort_unstable();
        labels
    }

    pub fn n_labels(&self) -> u64 {
        self.n_labels
    }

    /// Labels on tags within `range` steps of `seq`.
    pub fn sweep_label_neighborhood(&self, seq: &str, range: u32) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .core
            .tags_near(seq, range)
            .into_iter()
            .flat_map(|tag| self.get_tag_labels(tag))
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}

impl PresenceOps for LabelEngine {
    fn ksize(&self) -> u32 {
        self.core.ksize()
    }

    fn hashsizes(&self) -> Vec<u64> {
        self.core.hashsizes()
    }

    fn consume(&mut self, seq: &str) -> u64 {
        self.core.consume(seq)
    }

    fn count(&mut self, kmer: &str) -> EngineResult<()> {
        self.core.count(kmer)
    }

    fn get(&self, kmer: &str) -> EngineResult<u32> {
        self.core.get(kmer)
    }

    fn get_hash(&self, hash: KmerHash) -> u32 {
        self.core.get_hash(hash)
    }

    fn n_unique_kmers(&self) -> u64 {
        self.core.n_unique_kmers()
    }

    fn n_occupied(&self) -> u64 {
        self.core.n_occupied()
    }

    fn n_tags(&self) -> usize {
        self.core.n_tags()
    }

    fn add_tag(&mut self, kmer: &str) -> EngineResult<()> {
        self.core.add_tag(kmer)
    }

    fn add_stop_tag(&mut self, kmer: &str) -> EngineResult<()> {
        self.core.add_stop_tag(kmer)
    }

    fn get_tagset(&self) -> EngineResult<Vec<String>> {
        self.core.get_tagset()
    }

    fn get_stop_tags(&self) -> EngineResult<Vec<String>> {
        self.core.get_stop_tags()
    }

    fn tag_density(&self) -> u32 {
        self.core.tag_density()
    }

    fn set_tag_density(&mut self, density: u32) {
        self.core.set_tag_density(density)
    }

    fn consume_and_tag(&mut self, seq: &str) -> u64 {
        self.core.consume_and_tag(seq)
    }

    fn consume_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        self.core.consume_file(parser, bridge)
    }

    fn consume_file_and_tag(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        self.core.consume_file_and_tag(parser, bridge)
    }

    fn filter_if_present(
        &mut self,
        parser: &mut StreamingParser,
        out: &Path,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        self.core.filter_if_present(parser, out, bridge)
    }

    fn trim_on_stoptags(&self, seq: &str) -> (String, usize) {
        self.core.trim_on_stoptags(seq)
    }

    fn consume_file_and_tag_with_stoptags(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        self.core.consume_file_and_tag_with_stoptags(parser, bridge)
    }

    fn consume_partitioned_file(
        &mut self,
        parser: &mut StreamingParser,
        bridge: &CancellationBridge,
    ) -> EngineResult<ConsumeStats> {
        self.core.consume_partitioned_file(parser, bridge)
    }

    fn output_partitions(
        &self,
        parser: &mut StreamingParser,
        out: &Path,
        output_unassigned: bool,
        bridge: &CancellationBridge,
    ) -> EngineResult<PartitionOutput> {
        self.core
            .output_partitions(parser, out, output_unassigned, bridge)
    }

    fn find_all_tags(&self, kmer: &str) -> EngineResult<OpaqueHandle> {
        self.core.find_all_tags(kmer)
    }

    fn assign_partition_id(&mut self, info: &OpaqueHandle) -> EngineResult<PartitionId> {
        self.core.assign_partition_id(info)
    }

    fn do_subset_partition(
        &self,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<OpaqueHandle> {
        self.core.do_subset_partition(start, end, flags, bridge)
    }

    fn merge_subset(&mut self, subset: &OpaqueHandle) -> EngineResult<()> {
        self.core.merge_subset(subset)
    }

    fn merge_subset_from_disk(&mut self, path: &Path) -> EngineResult<()> {
        self.core.merge_subset_from_disk(path)
    }

    fn get_partition_id(&self, kmer: &str) -> EngineResult<PartitionId> {
        self.core.get_partition_id(kmer)
    }

    fn join_partitions(&mut self, a: PartitionId, b: PartitionId) -> PartitionId {
        self.core.join_partitions(a, b)
    }

    fn count_partitions(&self) -> (u64, u64) {
        self.core.count_partitions()
    }

    fn save(&self, path: &Path) -> EngineResult<()> {
        self.core.save(path)
    }

    fn load(&mut self, path: &Path) -> EngineResult<()> {
        self.core.load(path)
    }

    fn save_tagset(&self, path: &Path) -> EngineResult<()> {
        self.core.save_tagset(path)
    }

    /// Replaces the tag set; labels stay attached only to tags that survive.
    fn load_tagset(&mut self, path: &Path) -> EngineResult<()> {
        self.core.load_tagset(path)?;
        let tags = self.core.graph().tags();
        self.tag_labels.retain(|tag, _| tags.contains(*tag));
        Ok(())
    }

    fn save_stop_tags(&self, path: &Path) -> EngineResult<()> {
        self.core.save_stop_tags(path)
    }

    fn load_stop_tags(&mut self, path: &Path) -> EngineResult<()> {
        self.core.load_stop_tags(path)
    }

    fn save_partitionmap(&self, path: &Path) -> EngineResult<()> {
        self.core.save_partitionmap(path)
    }

    fn load_partitionmap(&mut self, path: &Path) -> EngineResult<()> {
        self.core.load_partitionmap(path)
    }
}
