//! # Tracing Setup
//!
//! Installs the global `tracing` subscriber for binaries built on this crate.

use tracing_subscriber::EnvFilter;

/// Initializes the fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies (usually
/// `FloorConfig::logging.filter`). Calling this twice is harmless: the
/// second install is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
