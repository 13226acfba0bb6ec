// src/logging.rs
// =============================================================================
// Diagnostics setup.
//
// Everything tracing emits goes to stderr, so stdout carries nothing but
// progress lines. How much shows up depends on --verbose:
// - verbose: warnings and errors (per-URL failures, skipped input lines)
// - quiet:   errors only (setup failures, unreadable input)
// RUST_LOG, when set, replaces both defaults.
// =============================================================================

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter directive used when RUST_LOG is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "concurl=warn"
    } else {
        "concurl=error"
    }
}

/// RUST_LOG if present, otherwise `default_directive(verbose)`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Plain one-line-per-event formatter writing to `writer`.
pub fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false) // Don't clutter diagnostics with module paths
        .without_time()
        .with_ansi(false)
        .finish()
}

/// Installs the stderr subscriber for the whole process.
pub fn init(verbose: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber(env_filter(verbose), std::io::stderr))
}
