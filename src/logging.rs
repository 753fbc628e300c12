//! Diagnostics setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Diagnostics go to stderr so stdout stays
/// the report. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
