//! Partition maps and the two opaque payloads of the partitioning flow.

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use seqbind_core::bridge::CancellationBridge;
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::handle::{HandleKind, HandlePayload};
use seqbind_core::types::{KmerHash, PartitionId};

use super::tags::TagSet;
use super::traversal::{find_all_tags, Traversal, TraversalLimits};
use crate::kmer::Kmer;
use crate::persist;
use crate::table::KmerTable;

pub(crate) const PARTITION_FORMAT: &str = "seqbind-partitionmap";
pub(crate) const SUBSET_FORMAT: &str = "seqbind-subset";

/// Tags between partition progress reports.
pub const PARTITION_REPORT_INTERVAL: u64 = 10_000;

/// Assignment of tags to partitions. Id 0 marks a tag seen but left
/// unassigned (an abandoned traversal).
#[derive(Debug, Clone)]
pub struct PartitionMap {
    next_id: PartitionId,
    assignments: FxHashMap<KmerHash, PartitionId>,
    members: FxHashMap<PartitionId, Vec<KmerHash>>,
}

impl Default for PartitionMap {
    fn default() -> Self {
        Self {
            next_id: 1,
            assignments: FxHashMap::default(),
            members: FxHashMap::default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PartitionEntries {
    entries: Vec<(KmerHash, PartitionId)>,
}

impl PartitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries(entries: Vec<(KmerHash, PartitionId)>) -> Self {
        let mut map = Self::new();
        for (tag, pid) in entries {
            map.assignments.insert(tag, pid);
            if pid != 0 {
                map.members.entry(pid).or_default().push(tag);
                map.next_id = map.next_id.max(pid + 1);
            }
        }
        map
    }

    fn to_entries(&self) -> PartitionEntries {
        let mut entries: Vec<_> = self.assignments.iter().map(|(&t, &p)| (t, p)).collect();
        entries.sort_unstable();
        PartitionEntries { entries }
    }

    pub fn get(&self, tag: KmerHash) -> PartitionId {
        self.assignments.get(&tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: KmerHash) -> bool {
        self.assignments.contains_key(&tag)
    }

    /// Number of tags seen, assigned or not.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Record `tag` as seen without a partition, unless it already has one.
    pub fn mark_unassigned(&mut self, tag: KmerHash) {
        self.assignments.entry(tag).or_insert(0);
    }

    fn relabel(&mut self, from: PartitionId, to: PartitionId) {
        if from == to {
            return;
        }
        if let Some(moved) = self.members.remove(&from) {
            for &tag in &moved {
                self.assignments.insert(tag, to);
            }
            self.members.entry(to).or_default().extend(moved);
        }
    }

    /// Put every tag in `tags` into one partition, merging any partitions
    /// they already belong to. Returns that partition, or 0 for no tags.
    pub fn join(&mut self, tags: impl IntoIterator<Item = KmerHash>) -> PartitionId {
        let tags: Vec<KmerHash> = tags.into_iter().collect();
        if tags.is_empty() {
            return 0;
        }

        let mut existing: Vec<PartitionId> = tags
            .iter()
            .map(|&t| self.get(t))
            .filter(|&pid| pid != 0)
            .collect();
        existing.sort_unstable();
        existing.dedup();

        let target = match existing.first() {
            Some(&pid) => pid,
            None => {
                let pid = self.next_id;
                self.next_id += 1;
                pid
            }
        };
        for &pid in existing.iter().skip(1) {
            self.relabel(pid, target);
        }
        for tag in tags {
            if self.get(tag) != target {
                self.assignments.insert(tag, target);
                self.members.entry(target).or_default().push(tag);
            }
        }
        target
    }

    /// Put `tag` in partition `pid` as read back from partitioned output,
    /// moving it out of any partition it was in. `pid` 0 marks it unassigned.
    pub fn assign(&mut self, tag: KmerHash, pid: PartitionId) {
        let previous = self.get(tag);
        if previous == pid && self.contains(tag) {
            return;
        }
        if previous != 0 {
            if let Some(members) = self.members.get_mut(&previous) {
                members.retain(|&t| t != tag);
                if members.is_empty() {
                    self.members.remove(&previous);
                }
            }
        }
        self.assignments.insert(tag, pid);
        if pid != 0 {
            self.members.entry(pid).or_default().push(tag);
            self.next_id = self.next_id.max(pid + 1);
        }
    }

    /// Merge partition `b` into `a`. Returns the surviving id.
    pub fn join_partitions(&mut self, a: PartitionId, b: PartitionId) -> PartitionId {
        match (a, b) {
            (0, other) | (other, 0) => other,
            (a, b) => {
                self.relabel(b, a);
                a
            }
        }
    }

    /// Fold another map in, joining each of its partitions.
    pub fn merge(&mut self, other: &PartitionMap) {
        let mut pids: Vec<_> = other.members.keys().copied().collect();
        pids.sort_unstable();
        for pid in pids {
            if let Some(tags) = other.members.get(&pid) {
                self.join(tags.iter().copied());
            }
        }
        for (&tag, &pid) in &other.assignments {
            if pid == 0 {
                self.mark_unassigned(tag);
            }
        }
    }

    /// `(partitions, unassigned tags)`.
    pub fn count_partitions(&self) -> (u64, u64) {
        let unassigned = self.assignments.values().filter(|&&pid| pid == 0).count();
        (self.members.len() as u64, unassigned as u64)
    }

    /// `(partition id, size)` in id order.
    pub fn partition_sizes(&self) -> Vec<(PartitionId, u64)> {
        let mut sizes: Vec<_> = self
            .members
            .iter()
            .map(|(&pid, tags)| (pid, tags.len() as u64))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    /// `(partition size, number of partitions of that size)` ascending.
    pub fn partition_size_distribution(&self) -> Vec<(u64, u64)> {
        let mut dist: BTreeMap<u64, u64> = BTreeMap::new();
        for tags in self.members.values() {
            *dist.entry(tags.len() as u64).or_default() += 1;
        }
        dist.into_iter().collect()
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        persist::save(path, PARTITION_FORMAT, &self.to_entries())
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let entries: PartitionEntries = persist::load(path, PARTITION_FORMAT)?;
        Ok(Self::from_entries(entries.entries))
    }
}

/// Flags for a subset partition run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionFlags {
    pub stop_big_traversals: bool,
    /// Only traverse k-mers whose count lies in `[min, max]`.
    pub abundance: Option<(u32, u32)>,
}

/// A seed k-mer and the tags found from it, waiting for a partition id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrePartitionInfo {
    pub kmer: KmerHash,
    pub tagged_kmers: Vec<KmerHash>,
}

impl HandlePayload for PrePartitionInfo {
    const KIND: HandleKind = HandleKind::PrePartitionInfo;
}

/// A detached partition sub-engine covering tags in `[start, end)`.
#[derive(Debug, Clone)]
pub struct SubsetPartition {
    ksize: u32,
    start: KmerHash,
    end: KmerHash,
    map: PartitionMap,
}

#[derive(Serialize, Deserialize)]
struct SubsetFile {
    ksize: u32,
    start: KmerHash,
    end: KmerHash,
    entries: Vec<(KmerHash, PartitionId)>,
}

impl HandlePayload for SubsetPartition {
    const KIND: HandleKind = HandleKind::SubsetPartition;

    fn release(self) {
        tracing::debug!(
            start = self.start,
            end = self.end,
            tags = self.map.len(),
            "subset partition released"
        );
    }
}

impl SubsetPartition {
    pub fn new(ksize: u32, start: KmerHash, end: KmerHash) -> Self {
        Self {
            ksize,
            start,
            end,
            map: PartitionMap::new(),
        }
    }

    pub fn ksize(&self) -> u32 {
        self.ksize
    }

    pub fn range(&self) -> (KmerHash, KmerHash) {
        (self.start, self.end)
    }

    pub fn map(&self) -> &PartitionMap {
        &self.map
    }

    fn in_range(&self, tag: KmerHash) -> bool {
        tag >= self.start && (self.end == 0 || tag < self.end)
    }

    /// Partition every tag in range, reporting through `bridge` every
    /// `PARTITION_REPORT_INTERVAL` tags.
    pub fn do_partition(
        &mut self,
        table: &dyn KmerTable,
        tags: &TagSet,
        limit: u64,
        flags: PartitionFlags,
        bridge: &CancellationBridge,
    ) -> EngineResult<()> {
        let limits = TraversalLimits {
            limit,
            stop_big_traversals: flags.stop_big_traversals,
            abundance: flags.abundance,
        };
        let seeds: Vec<KmerHash> = tags
            .sorted()
            .into_iter()
            .filter(|&t| self.in_range(t))
            .collect();
        tracing::info!(
            start = self.start,
            end = self.end,
            seeds = seeds.len(),
            "subset partition started"
        );

        for (i, &tag) in seeds.iter().enumerate() {
            if !self.map.contains(tag) {
                match find_all_tags(table, tags, Kmer::from_hash(tag, self.ksize), &limits) {
                    Traversal::Found(mut found) => {
                        found.insert(tag);
                        self.map.join(found);
                    }
                    Traversal::Abandoned => self.map.mark_unassigned(tag),
                }
            }

            let done = i as u64 + 1;
            if done % PARTITION_REPORT_INTERVAL == 0 {
                bridge
                    .report("do_subset_partition", done, self.map.len() as u64)
                    .map_err(|interrupted| {
                        let assigned = self.map.len() as u64;
                        interrupted.into_cancelled("do_subset_partition", done, assigned)
                    })?;
            }
        }

        let (n_partitions, n_unassigned) = self.map.count_partitions();
        tracing::info!(n_partitions, n_unassigned, "subset partition finished");
        Ok(())
    }

    pub fn partition_id(&self, tag: KmerHash) -> PartitionId {
        self.map.get(tag)
    }

    pub fn count_partitions(&self) -> (u64, u64) {
        self.map.count_partitions()
    }

    pub fn partition_sizes(&self) -> Vec<(PartitionId, u64)> {
        self.map.partition_sizes()
    }

    pub fn partition_size_distribution(&self) -> Vec<(u64, u64)> {
        self.map.partition_size_distribution()
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let file = SubsetFile {
            ksize: self.ksize,
            start: self.start,
            end: self.end,
            entries: self.map.to_entries().entries,
        };
        persist::save(path, SUBSET_FORMAT, &file)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let file: SubsetFile = persist::load(path, SUBSET_FORMAT)?;
        if file.ksize == 0 {
            return Err(EngineError::file(path, "subset has k-mer size 0"));
        }
        Ok(Self {
            ksize: file.ksize,
            start: file.start,
            end: file.end,
            map: PartitionMap::from_entries(file.entries),
        })
    }
}
