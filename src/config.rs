// src/config.rs
// =============================================================================
// Runtime configuration, validated once at startup.
//
// The parsed CLI flags are checked and frozen into a `Config`, which is then
// shared read-only by every worker through an `Arc<Config>`. Nothing in here
// changes after `Config::from_cli` returns.
// =============================================================================

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderValue;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Default cap on captured body bytes (10 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Input lines longer than this many bytes are skipped.
pub const MAX_URL_LENGTH: usize = 2048;

/// Redirects followed before a fetch fails with `TooManyRedirects`.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of workers, and the per-host connection pool size
    pub concurrency: usize,
    /// Minimum spacing between request starts to the same domain
    pub delay: Duration,
    /// Root of the `<domain>/<hash>` artifact tree
    pub output_dir: PathBuf,
    /// Total time budget for one request, body included
    pub timeout: Duration,
    /// Body bytes kept per response; the rest is silently dropped
    pub max_size: u64,
    /// Accept invalid TLS certificates
    pub insecure: bool,
    pub user_agent: String,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 20,
            delay: Duration::from_secs(5),
            output_dir: PathBuf::from("out"),
            timeout: Duration::from_secs(30),
            max_size: DEFAULT_MAX_SIZE,
            insecure: false,
            user_agent: "concurl/2.0".to_string(),
            verbose: false,
        }
    }
}

impl Config {
    /// Builds and validates the configuration from parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self {
            concurrency: cli.concurrency,
            delay: cli.delay,
            output_dir: cli.output_dir,
            timeout: cli.timeout,
            max_size: cli.max_size,
            insecure: cli.insecure,
            user_agent: cli.user_agent,
            verbose: cli.verbose,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.max_size == 0 {
            bail!("max size must be greater than 0 bytes");
        }
        if self.user_agent.trim().is_empty() {
            bail!("user agent must not be empty");
        }
        HeaderValue::from_str(&self.user_agent)
            .with_context(|| format!("user agent '{}' is not a valid header value", self.user_agent))?;
        Ok(())
    }

    /// Capacity of the job queue: a shallow lookahead of two jobs per worker.
    pub fn queue_capacity(&self) -> usize {
        self.concurrency * 2
    }
}
