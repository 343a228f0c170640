//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global tracing subscriber.
///
/// Filtering follows `RUST_LOG`, e.g. `RUST_LOG=debug,quizwire_clock=info`.
/// Defaults to `info` when unset.
pub fn init() {
    let fmt_layer = fmt::layer().with_target(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
