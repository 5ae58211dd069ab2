//! Logging setup.
//!
//! Structured logs go to stderr so stdout stays free for tooling that
//! wraps the binaries. The filter comes from `RDOCKER_LOG` (standard
//! `tracing_subscriber::EnvFilter` syntax), defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV_VAR: &str = "RDOCKER_LOG";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Initializes the global tracing subscriber.
///
/// Safe to call once per process; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
