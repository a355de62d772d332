//! Logging configuration for rsq.
//!
//! Diagnostics go to stderr so stdout carries only the rendered result.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging.
///
/// The default level is `warn` to keep normal runs quiet; set `RUST_LOG`
/// (e.g. `RUST_LOG=rsq=debug`) for more.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
