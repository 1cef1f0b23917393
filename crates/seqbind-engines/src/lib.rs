//! seqbind-engines: reference engines consumed through the seqbind boundary.
//!
//! Every long-running operation here threads a `CancellationBridge` through
//! its loop and returns partial state as `OpaqueHandle`s.

pub mod aligner;
pub mod cardinality;
pub mod counting;
pub mod driver;
pub mod graph;
pub mod kmer;
pub mod labels;
pub mod persist;
pub mod presence;
pub mod table;

pub use aligner::{Alignment, ReadAligner};
pub use cardinality::HllCounter;
pub use counting::CountingEngine;
pub use driver::ConsumeStats;
pub use graph::{PartitionFlags, PrePartitionInfo, SubsetPartition};
pub use labels::LabelEngine;
pub use presence::{partition_in_shards, PresenceEngine, PresenceOps};
