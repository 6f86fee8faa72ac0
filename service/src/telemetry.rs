//! Logging setup for binaries
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the process that embeds it.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber on stderr
///
/// `verbosity` maps 0 to `warn`, 1 to `info`, 2 to `debug` and anything
/// higher to `trace`. A `RUST_LOG` setting overrides it. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
