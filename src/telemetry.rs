//! Tracing setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogSettings;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(log: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(log: &LogSettings) {
    let base = fmt::layer().with_target(true);
    let fmt_layer = if log.json {
        base.json().boxed()
    } else {
        base.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(log))
        .with(fmt_layer)
        .try_init();
}
