// src/main.rs
// =============================================================================
// This is the entry point of concurl.
//
// What happens here:
// 1. Parse command-line flags and validate them into a Config
// 2. Set up diagnostics on stderr (only chatty with --verbose)
// 3. Create the output directory (the one failure that stops a run)
// 4. Build the shared HTTP client and rate limiter
// 5. Stream stdin through the worker pool until every URL is handled
//
// Exit codes: 0 = run finished (even if every URL failed),
//             1 = setup failed (output dir, HTTP client),
//             2 = invalid configuration
//
// Rust concepts used:
// - async/await: workers spend most of their time waiting on the network
// - Arc: config, client and limiter are shared by every worker task
// - anyhow::Context: attaches a human-readable reason to setup errors
// =============================================================================

// Module declarations - one per source file / directory under src/
mod cli; // src/cli.rs - command-line flags
mod config; // src/config.rs - validated settings
mod fetch; // src/fetch/ - rate limiter, fetch pipeline, artifacts
mod logging; // src/logging.rs - tracing setup
mod pool; // src/pool/ - job queue and worker pool

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables Cli::parse()
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use cli::Cli;
use config::Config;
use fetch::{Fetcher, RateLimiter};
use pool::StdoutProgress;

// #[tokio::main] builds the multi-threaded runtime the workers run on
#[tokio::main]
async fn main() {
    // Run the application and turn its outcome into an exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Setup failure: the run never started
            error!("{:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

// Returns Ok(exit code) for every outcome we planned for, and Err for
// setup failures that stop the run before any URL is read.
async fn run() -> Result<i32> {
    // clap prints usage and exits by itself on bad flags
    let cli = Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            // No validated verbosity to go by; errors are always shown anyway
            logging::init(false).context("Failed to install log subscriber")?;
            error!("Invalid configuration: {:#}", e);
            return Ok(2);
        }
    };
    logging::init(config.verbose).context("Failed to install log subscriber")?;

    // Creating the root up front is the only check that aborts the run
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.output_dir.display()
            )
        })?;

    // One limiter and one client for the whole run
    let limiter = Arc::new(RateLimiter::new(config.delay));
    let fetcher = Fetcher::new(Arc::clone(&config), Arc::clone(&limiter))
        .context("Failed to build HTTP client")?;

    debug!(
        concurrency = config.concurrency,
        delay = ?limiter.delay(),
        timeout = ?config.timeout,
        output = %config.output_dir.display(),
        "starting run"
    );

    // Ctrl-C cancels this token; the producer and workers watch it
    let cancel = CancellationToken::new();
    tokio::spawn(watch_for_shutdown(cancel.clone()));

    let stats = pool::run(
        &config,
        Arc::new(fetcher),
        BufReader::new(tokio::io::stdin()),
        Arc::new(StdoutProgress),
        cancel,
    )
    .await;

    debug!(
        queued = stats.queued,
        skipped = stats.skipped,
        domains = limiter.domain_count(),
        "run finished"
    );

    // Individual job failures never change the exit code
    Ok(0)
}

// First Ctrl-C: stop reading input and let in-flight requests finish.
// Second Ctrl-C: give up immediately.
async fn watch_for_shutdown(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Shutdown requested, finishing in-flight requests (Ctrl-C again to abort)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
