//! seqbind-core: the binding boundary between a host runtime and blocking
//! native sequence engines.
//!
//! - Errors: one enum per subsystem, each with a stable host error code
//! - Config: TOML defaults for engines, layered with `SEQBIND_*` overrides
//! - Bridge: the cancellation and progress point every long-running call uses
//! - Handles: tagged opaque handles, their registry, and engine ownership
//! - Stream: FASTA/FASTQ reading, record iteration, pair iteration

pub mod bridge;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handle;
pub mod stream;
pub mod tracing;
pub mod traits;
pub mod types;

pub use bridge::{CancellationBridge, Interrupted};
pub use config::SeqbindConfig;
pub use errors::{
    ConfigError, EngineError, EngineResult, HandleError, ParseError, SeqbindErrorCode,
};
pub use handle::{EngineHandle, HandleId, HandleKind, HandlePayload, HandleRegistry, OpaqueHandle};
pub use stream::{ParserHandle, RecordPairIterator, StreamingParser};
pub use traits::{CancellationToken, ObserverChoice, ProgressDefaults, ProgressObserver};
pub use types::{KmerHash, Label, PairingPolicy, PartitionId, RecordPair, SequenceRecord};
