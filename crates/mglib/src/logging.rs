//! Subscriber setup for binaries embedding the library.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"mglib=info"`) when the variable is unset
/// or invalid.
///
/// Library code never calls this. Calling it twice is harmless: the
/// second call leaves the first subscriber in place.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("global subscriber already set");
    }
}
