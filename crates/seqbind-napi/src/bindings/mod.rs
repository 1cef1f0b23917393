//! All NAPI-exported functions and classes, grouped by domain.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use seqbind_core::errors::EngineError;
use seqbind_core::handle::EngineHandle;
use seqbind_core::stream::StreamingParser;

use crate::conversions::error_codes;

#[macro_use]
mod presence_ops;

pub mod aligner;
pub mod cardinality;
pub mod counting;
pub mod handles;
pub mod hashing;
pub mod labels;
pub mod lifecycle;
pub mod parser;
pub mod presence;

/// Engines behind JS classes. A task clones the `Arc` so the engine outlives
/// the class's `release()` while work is in flight.
pub(crate) type Shared<E> = Arc<Mutex<E>>;

pub(crate) fn shared<E>(handle: &EngineHandle<Shared<E>>) -> napi::Result<Shared<E>> {
    handle
        .get()
        .map(Arc::clone)
        .map_err(error_codes::to_napi_error)
}

/// Blocking lock, for work running on the thread pool.
pub(crate) fn lock<E>(engine: &Mutex<E>) -> MutexGuard<'_, E> {
    engine.lock().unwrap_or_else(|e| e.into_inner())
}

/// Non-blocking lock for calls made on the JS thread. While a task holds the
/// engine this fails with `RESOURCE_BUSY`: waiting would block the event loop
/// the task's observer needs.
pub fn try_lock<'a, E>(engine: &'a Mutex<E>, resource: &str) -> napi::Result<MutexGuard<'a, E>> {
    match engine.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => {
            Err(error_codes::to_napi_error(EngineError::busy(resource)))
        }
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
    }
}

/// A fresh consumer over the same stream as `parser`. The stream allows one
/// active consumer at a time.
pub(crate) fn consumer(parser: &parser::ReadParser) -> StreamingParser {
    StreamingParser::new(parser.stream().clone())
}
