//! Diagnostic logging setup.
//!
//! Status lines are printed directly to stderr by each command; `tracing`
//! events from the pipeline go through the subscriber installed here. The
//! level follows `--quiet`/`--verbose` unless `BITFORGE_LOG` holds an
//! `EnvFilter` directive.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::GlobalArgs;

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "BITFORGE_LOG";

/// Default filter directive for the given flags.
pub fn default_directive(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(global)));

    let layer = fmt::layer()
        .compact()
        .with_target(global.verbose)
        .without_time()
        .with_writer(io::stderr)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(layer).try_init();
}
