//! Seams between the boundary, the host runtime and the engines.

pub mod cancellation;
pub mod host;
pub mod observer;

pub use cancellation::{Cancellable, CancellationToken};
pub use host::{suspended, HostLock, NoHostLock};
pub use observer::{ObserverChoice, ObserverError, ProgressDefaults, ProgressObserver};
