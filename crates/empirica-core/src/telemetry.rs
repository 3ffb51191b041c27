//! Logging bootstrap for binaries and integration tests.
//!
//! The core never installs a global subscriber on its own — that is an
//! application concern — but ships this convenience helper so embedders
//! don't each reinvent an env-filter-driven `tracing-subscriber` setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a default `tracing-subscriber` with an env-filter defaulting to
/// `info`. Safe to call more than once; subsequent calls are no-ops.
pub fn init_default() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
