//! Handle protocols: opaque partial-computation handles, the id registry
//! used by host surfaces, and exclusive engine ownership.

pub mod engine_handle;
pub mod opaque;
pub mod registry;

pub use engine_handle::EngineHandle;
pub use opaque::{HandleKind, HandlePayload, OpaqueHandle};
pub use registry::{HandleId, HandleRegistry};
