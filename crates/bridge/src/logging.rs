//! Diagnostic logging.
//!
//! Logs go to stderr so they never mix with controller output on stdout.
//! The level comes from `RUST_LOG` when set, `info` otherwise. The console's
//! debug flag raises the default level to `debug` (showing every serial read
//! and write) on top of whatever `RUST_LOG` selects for individual targets.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Filter from an optional `RUST_LOG`-style directive string.
pub fn build_filter(env: Option<&str>, debug: bool) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(debug)));
    if debug {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(debug: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), debug);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
