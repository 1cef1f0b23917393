//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the seqbind tracing/logging system.
///
/// Reads the `SEQBIND_LOG` environment variable for per-module log levels.
/// Format: `SEQBIND_LOG=seqbind_core=debug,seqbind_engines=info`
///
/// Falls back to `seqbind=info` if `SEQBIND_LOG` is not set or is invalid.
/// Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SEQBIND_LOG")
            .unwrap_or_else(|_| EnvFilter::new("seqbind=info"));

        // A host may already have installed a global subscriber.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init();
    });
}
