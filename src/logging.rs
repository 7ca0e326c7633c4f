//! Tracing setup shared by both binaries.
//!
//! Log lines go to stderr so they never interleave with the chat output on
//! stdout. The filter comes from `CHATLINE_LOG_LEVEL` and accepts the usual
//! `EnvFilter` directives, e.g. `chatline=debug`.

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;

/// Build the filter from the environment, falling back to the default level
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(config::LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber; a second call is a no-op
pub fn init_tracing() {
    let layer = fmt::layer()
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(env_filter())
        .try_init();
}
