//! Tag and stop-tag sets.

use rustc_hash::FxHashSet;

use seqbind_core::types::KmerHash;

/// Tagged k-mers sampled along consumed sequences, plus stop tags that
/// traversals never cross.
#[derive(Debug, Clone)]
pub struct TagSet {
    density: u32,
    tags: FxHashSet<KmerHash>,
    stop_tags: FxHashSet<KmerHash>,
}

impl TagSet {
    pub fn new(density: u32) -> Self {
        Self {
            density: density.max(1),
            tags: FxHashSet::default(),
            stop_tags: FxHashSet::default(),
        }
    }

    pub fn density(&self) -> u32 {
        self.density
    }

    pub fn set_density(&mut self, density: u32) {
        self.density = density.max(1);
    }

    pub fn insert(&mut self, tag: KmerHash) -> bool {
        self.tags.insert(tag)
    }

    pub fn insert_stop(&mut self, tag: KmerHash) -> bool {
        self.stop_tags.insert(tag)
    }

    pub fn contains(&self, tag: KmerHash) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_stop(&self, tag: KmerHash) -> bool {
        self.stop_tags.contains(&tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn n_stop_tags(&self) -> usize {
        self.stop_tags.len()
    }

    /// Tags in ascending hash order.
    pub fn sorted(&self) -> Vec<KmerHash> {
        let mut tags: Vec<_> = self.tags.iter().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn sorted_stop_tags(&self) -> Vec<KmerHash> {
        let mut tags: Vec<_> = self.stop_tags.iter().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn replace_tags(&mut self, tags: impl IntoIterator<Item = KmerHash>) {
        self.tags = tags.into_iter().collect();
    }

    pub fn replace_stop_tags(&mut self, tags: impl IntoIterator<Item = KmerHash>) {
        self.stop_tags = tags.into_iter().collect();
    }
}
