//! Sequence records.

use serde::{Deserialize, Serialize};

/// One sequence record as produced by a reader.
///
/// `quality` is empty for FASTA input. `annotations` is the header text
/// after the first whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub name: String,
    pub sequence: String,
    pub quality: String,
    pub annotations: String,
}

impl SequenceRecord {
    pub fn new(name: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
            ..Self::default()
        }
    }

    /// The empty record standing in for a missing mate.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.sequence.is_empty()
    }

    pub fn has_quality(&self) -> bool {
        !self.quality.is_empty()
    }

    /// Mate number encoded in the name (`/1`, `/2`) or in Casava 1.8
    /// annotations (`1:...`, `2:...`).
    pub fn mate(&self) -> Option<u8> {
        if self.name.ends_with("/1") || self.annotations.starts_with("1:") {
            Some(1)
        } else if self.name.ends_with("/2") || self.annotations.starts_with("2:") {
            Some(2)
        } else {
            None
        }
    }

    /// True when `self` is mate 1 and `other` is its mate 2.
    pub fn pairs_with(&self, other: &SequenceRecord) -> bool {
        if let (Some(a), Some(b)) = (self.name.strip_suffix("/1"), other.name.strip_suffix("/2")) {
            return !a.is_empty() && a == b;
        }
        !self.name.is_empty()
            && self.name == other.name
            && self.annotations.starts_with("1:")
            && other.annotations.starts_with("2:")
    }
}

/// Two records read as mates. Under `AllowUnpaired` one side may be the
/// placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPair {
    pub first: SequenceRecord,
    pub second: SequenceRecord,
}

impl RecordPair {
    pub fn new(first: SequenceRecord, second: SequenceRecord) -> Self {
        Self { first, second }
    }

    pub fn is_complete(&self) -> bool {
        !self.first.is_placeholder() && !self.second.is_placeholder()
    }
}
