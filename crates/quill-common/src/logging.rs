//! Logging setup.
//!
//! Library crates only ever talk to the `tracing` facade. Binaries (and tests
//! that want to see output) call [`init_logging`] once to install a formatter.

use tracing_subscriber::EnvFilter;

/// Install a `tracing-subscriber` formatter writing to stderr.
///
/// The filter is taken from `RUST_LOG` when set. Otherwise it defaults to
/// `warn`, or `debug` when `verbose` is true. Calling this more than once is
/// harmless: later calls leave the first subscriber in place.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
