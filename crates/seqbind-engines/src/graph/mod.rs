//! The tag graph: sampled tags over a k-mer table, tag traversal and
//! partitioning.

pub mod partition;
pub mod partitioned;
pub mod tags;
pub mod traversal;

pub use partition::{
    PartitionFlags, PartitionMap, PrePartitionInfo, SubsetPartition, PARTITION_REPORT_INTERVAL,
};
pub use partitioned::{parse_partition_id, PartitionOutput};
pub use tags::TagSet;
pub use traversal::{Traversal, TraversalLimits};

use std::path::Path;

use serde::{Deserialize, Serialize};

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::config::PartitionConfig;
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::types::{KmerHash, PartitionId};

use crate::kmer::{Kmer, KmerIterator};
use crate::persist;
use crate::table::KmerTable;

const TAGSET_FORMAT: &str = "seqbind-tagset";
const STOPTAGS_FORMAT: &str = "seqbind-stoptags";

#[derive(Serialize, Deserialize)]
struct TagFile {
    ksize: u32,
    density: u32,
    tags: Vec<KmerHash>,
}

/// Tags, stop tags and the primary partition map of one engine.
///
/// Shared by the presence and counting engines; the table is passed in on
/// every call so each engine keeps ownership of its own.
#[derive(Debug, Clone)]
pub struct TagGraph {
    ksize: u32,
    tags: TagSet,
    partitions: PartitionMap,
    traversal_limit: u64,
    stop_big_traversals: bool,
}

impl TagGraph {
    pub fn new(ksize: u32, config: &PartitionConfig) -> Self {
        Self {
            ksize,
            tags: TagSet::new(config.effective_tag_density()),
            partitions: PartitionMap::new(),
            traversal_limit: config.effective_traversal_limit(),
            stop_big_traversals: config.effective_stop_big_traversals(),
        }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.tags
    }

    pub fn partitions(&self) -> &PartitionMap {
        &self.partitions
    }

    pub fn traversal_limit(&self) -> u64 {
        self.traversal_limit
    }

    /// Count every k-mer of `seq` and lay down tags at the configured
    /// density. Returns the k-mers consumed and the tags the sequence
    /// touches.
    pub fn consume_and_tag(
        &mut self,
        table: &mut dyn KmerTable,
        seq: &str,
    ) -> (u64, Vec<KmerHash>) {
        self.consume_tagged(table, seq, false)
    }

    /// `consume_and_tag` that skips stop-tagged k-mers entirely: they are
    /// neither counted nor tagged, and the run on each side of one is tagged
    /// at its ends.
    pub fn consume_and_tag_with_stop_tags(
        &mut self,
        table: &mut dyn KmerTable,
        seq: &str,
    ) -> (u64, Vec<KmerHash>) {
        self.consume_tagged(table, seq, true)
    }

    fn consume_tagged(
        &mut self,
        table: &mut dyn KmerTable,
        seq: &str,
        skip_stop: bool,
    ) -> (u64, Vec<KmerHash>) {
        let density = self.tags.density();
        let mut consumed = 0u64;
        let mut touched = Vec::new();
        let mut since = density;
        let mut last = None;

        for kmer in KmerIterator::new(seq, self.ksize) {
            let hash = kmer.canonical();
            if skip_stop && self.tags.is_stop(hash) {
                self.close_run(last.take(), since, &mut touched);
                since = density;
                continue;
            }

            table.count(hash);
            consumed += 1;
            last = Some(hash);

            if self.tags.contains(hash) {
                touched.push(hash);
                since = 0;
            } else if since >= density && !self.tags.is_stop(hash) {
                self.tags.insert(hash);
                touched.push(hash);
                since = 0;
            } else {
                since += 1;
            }
        }

        self.close_run(last, since, &mut touched);
        (consumed, touched)
    }

    /// Tag the final k-mer of a run unless it was just tagged.
    fn close_run(&mut self, last: Option<KmerHash>, since: u32, touched: &mut Vec<KmerHash>) {
        if since == 0 {
            return;
        }
        if let Some(hash) = last.filter(|&h| !self.tags.is_stop(h)) {
            self.tags.insert(hash);
            touched.push(hash);
        }
    }

    /// Trim `seq` before the first stop-tagged k-mer. Returns the kept
    /// prefix and its length.
    pub fn trim_on_stop_tags(&self, seq: &str) -> (String, usize) {
        let k = self.ksize as usize;
        let bytes = seq.as_bytes();
        for (i, window) in bytes.windows(k).enumerate() {
            let stop = std::str::from_utf8(window)
                .ok()
                .and_then(|w| Kmer::parse(w, self.ksize).ok())
                .is_some_and(|kmer| self.tags.is_stop(kmer.canonical()));
            if stop {
                let keep = if i == 0 { 0 } else { i + k - 1 };
                return (String::from_utf8_lossy(&bytes[..keep]).into_owned(), keep);
            }
        }
        (seq.to_string(), seq.len())
    }

    fn limits(&self, stop_big: bool, abundance: Option<(u32, u32)>) -> TraversalLimits {
        TraversalLimits {
            limit: self.traversal_limit,
            stop_big_traversals: stop_big,
            abundance,
        }
    }

    pub fn find_all_tags(
        &self,
        table: &dyn KmerTable,
        kmer: Kmer,
        abundance: Option<(u32, u32)>,
    ) -> PrePartitionInfo {
        let limits = self.limits(self.stop_big_traversals, abundance);
        let mut tagged_kmers: Vec<KmerHash> =
            match traversal::find_all_tags(table, &self.tags, kmer, &limits) {
                Traversal::Found(found) => found.into_iter().collect(),
                Traversal::Abandoned => Vec::new(),
            };
        tagged_kmers.sort_unstable();
        PrePartitionInfo {
            kmer: kmer.canonical(),
            tagged_kmers,
        }
    }

    pub fn assign_partition_id(&mut self, info: &PrePartitionInfo) -> PartitionId {
        let mut tags = info.tagged_kmers.clone();
        if self.tags.contains(info.kmer) {
            tags.push(info.kmer);
        }
        self.partitions.join(tags)
    }

    pub fn do_subset_partition(
        &self,
        table: &dyn KmerTable,
        start: KmerHash,
        end: KmerHash,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<SubsetPartition> {
        let mut subset = SubsetPartition::new(self.ksize, start, end);
        let flags = PartitionFlags {
            stop_big_traversals: flags.stop_big_traversals || self.stop_big_traversals,
            ..flags
        };
        subset.do_partition(table, &self.tags, self.traversal_limit, flags, bridge)?;
        Ok(subset)
    }

    pub fn merge_subset(&mut self, subset: &SubsetPartition) -> EngineResult<()> {
        if subset.ksize() != self.ksize {
            return Err(EngineError::InvalidArgument(format!(
                "subset k-mer size {} does not match engine k-mer size {}",
                subset.ksize(),
                self.ksize
            )));
        }
        self.partitions.merge(subset.map());
        Ok(())
    }

    pub fn merge_subset_from_disk(&mut self, path: &Path) -> EngineResult<()> {
        let subset = SubsetPartition::load(path)?;
        self.merge_subset(&subset)
    }

    pub fn partition_id(&self, hash: KmerHash) -> PartitionId {
        self.partitions.get(hash)
    }

    pub fn join_partitions(&mut self, a: PartitionId, b: PartitionId) -> PartitionId {
        self.partitions.join_partitions(a, b)
    }

    /// `(partitions, unassigned tags)`; tags never partitioned count as
    /// unassigned.
    pub fn count_partitions(&self) -> (u64, u64) {
        let (n_partitions, _) = self.partitions.count_partitions();
        let unassigned = self
            .tags
            .sorted()
            .into_iter()
            .filter(|&t| self.partitions.get(t) == 0)
            .count();
        (n_partitions, unassigned as u64)
    }

    pub fn save_tagset(&self, path: &Path) -> EngineResult<()> {
        let file = TagFile {
            ksize: self.ksize,
            density: self.tags.density(),
            tags: self.tags.sorted(),
        };
        persist::save(path, TAGSET_FORMAT, &file)
    }

    pub fn load_tagset(&mut self, path: &Path) -> EngineResult<()> {
        let file: TagFile = persist::load(path, TAGSET_FORMAT)?;
        self.check_file_ksize(path, file.ksize)?;
        self.tags.replace_tags(file.tags);
        self.tags.set_density(file.density);
        Ok(())
    }

    pub fn save_stop_tags(&self, path: &Path) -> EngineResult<()> {
        let file = TagFile {
            ksize: self.ksize,
            density: self.tags.density(),
            tags: self.tags.sorted_stop_tags(),
        };
        persist::save(path, STOPTAGS_FORMAT, &file)
    }

    pub fn load_stop_tags(&mut self, path: &Path) -> EngineResult<()> {
        let file: TagFile = persist::load(path, STOPTAGS_FORMAT)?;
        self.check_file_ksize(path, file.ksize)?;
        self.tags.replace_stop_tags(file.tags);
        Ok(())
    }

    pub fn save_partitionmap(&self, path: &Path) -> EngineResult<()> {
        self.partitions.save(path)
    }

    pub fn load_partitionmap(&mut self, path: &Path) -> EngineResult<()> {
        self.partitions = PartitionMap::load(path)?;
        Ok(())
    }

    fn check_file_ksize(&self, path: &Path, ksize: u32) -> EngineResult<()> {
        if ksize != self.ksize {
            return Err(EngineError::file(
                path,
                format!("file k-mer size {ksize} does not match engine k-mer size {}", self.ksize),
            ));
        }
        Ok(())
    }
}
