//! Breadth-first traversal of the implicit de Bruijn graph stored in a
//! k-mer table.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use seqbind_core::types::KmerHash;

use super::tags::TagSet;
use crate::kmer::{all_bases, Kmer};
use crate::table::KmerTable;

/// Bounds on a single tag search.
#[derive(Debug, Clone, Copy)]
pub struct TraversalLimits {
    pub limit: u64,
    pub stop_big_traversals: bool,
    /// Inclusive count window; nodes outside it are not entered. A max of 0
    /// means unbounded.
    pub abundance: Option<(u32, u32)>,
}

impl TraversalLimits {
    fn admits(&self, table: &dyn KmerTable, hash: KmerHash) -> bool {
        match self.abundance {
            None => true,
            Some((min, max)) => {
                let count = table.get(hash);
                count >= min && (max == 0 || count <= max)
            }
        }
    }
}

/// Outcome of a tag search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traversal {
    Found(FxHashSet<KmerHash>),
    /// Gave up after exceeding the traversal limit.
    Abandoned,
}

/// Present neighbours of `kmer`, both directions.
pub fn neighbors(table: &dyn KmerTable, kmer: Kmer) -> SmallVec<[Kmer; 8]> {
    let k = table.ksize();
    let mut out = SmallVec::new();
    for base in all_bases() {
        let right = kmer.extend_right(base, k);
        if table.contains(right.canonical()) {
            out.push(right);
        }
        let left = kmer.extend_left(base, k);
        if table.contains(left.canonical()) {
            out.push(left);
        }
    }
    out
}

/// Collect the tags reachable from `start` without crossing another tag
/// or a stop tag.
pub fn find_all_tags(
    table: &dyn KmerTable,
    tags: &TagSet,
    start: Kmer,
    limits: &TraversalLimits,
) -> Traversal {
    let mut found = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();

    let start_hash = start.canonical();
    visited.insert(start_hash);
    queue.push_back(start);
    if tags.contains(start_hash) {
        found.insert(start_hash);
    }

    while let Some(node) = queue.pop_front() {
        if limits.stop_big_traversals && visited.len() as u64 > limits.limit {
            return Traversal::Abandoned;
        }
        let hash = node.canonical();
        if hash != start_hash {
            if tags.is_stop(hash) {
                continue;
            }
            if tags.contains(hash) {
                found.insert(hash);
                continue;
            }
        }
        for next in neighbors(table, node) {
            let next_hash = next.canonical();
            if !limits.admits(table, next_hash) {
                continue;
            }
            if visited.insert(next_hash) {
                queue.push_back(next);
            }
        }
    }

    Traversal::Found(found)
}

/// Tags within `radius` steps of `start`, crossing tags freely.
pub fn tags_within(
    table: &dyn KmerTable,
    tags: &TagSet,
    start: Kmer,
    radius: u32,
) -> FxHashSet<KmerHash> {
    let mut found = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();

    visited.insert(start.canonical());
    queue.push_back((start, 0u32));

    while let Some((node, depth)) = queue.pop_front() {
        let hash = node.canonical();
        if tags.contains(hash) {
            found.insert(hash);
        }
        if depth >= radius || tags.is_stop(hash) {
            continue;
        }
        for next in neighbors(table, node) {
            if visited.insert(next.canonical()) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    found
}
