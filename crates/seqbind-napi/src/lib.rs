//! # seqbind-napi
//!
//! Node-API bindings for the seqbind boundary.
//!
//! Architecture:
//! - `runtime`: the `SeqbindRuntime` singleton holding config, the interrupt
//!   flag, default progress observer and the handle registry
//! - `conversions`: Rust ↔ JS types and `[ERROR_CODE] message` errors
//! - `observer`: JS functions as `ProgressObserver`s
//! - `task`: runs blocking engine work on the libuv pool
//! - `bindings`: exported functions and classes

pub mod bindings;
pub mod conversions;
pub mod observer;
pub mod runtime;
pub mod task;
