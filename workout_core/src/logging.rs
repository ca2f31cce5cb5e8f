//! Tracing setup for the `workout` binary and the test suite.
//!
//! Events go to stderr so they never interleave with the CLI's own output on
//! stdout. `RUST_LOG` always wins over the level passed in.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when neither `RUST_LOG` nor a verbosity flag is given
pub const DEFAULT_LEVEL: &str = "info";

pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Initialize logging, `debug` when verbose
pub fn init_verbose(verbose: bool) {
    init_with_level(if verbose { "debug" } else { DEFAULT_LEVEL })
}

/// Initialize logging with a specific default level
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Debug-level logging captured by the test harness
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
