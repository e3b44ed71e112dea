//! Log sink for the binary.
//!
//! Transitions are emitted as `tracing` events at `debug`; the final report
//! is `info`. `RUST_LOG` overrides the level chosen on the command line.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr `fmt` subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
