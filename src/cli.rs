// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// concurl has no subcommands: URLs arrive on stdin, one per line, and the
// flags below tune how hard and how politely we fetch them.
//
// Durations use the compact "5s" / "1m30s" / "250ms" notation so the flags
// stay compatible with earlier concurl releases.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_MAX_SIZE;

#[derive(Parser, Debug)]
#[command(
    name = "concurl",
    version,
    about = "Fetch a stream of URLs concurrently, politely, into a content-addressed directory",
    long_about = "concurl reads one URL per line from stdin, fetches each with a bounded pool of \
                  workers while spacing requests to the same domain, and stores every response \
                  (with its metadata) under <output>/<domain>/<hash>."
)]
pub struct Cli {
    /// Number of concurrent workers
    #[arg(short = 'c', long, default_value_t = 20)]
    pub concurrency: usize,

    /// Minimum delay between requests to the same domain (e.g. 5s, 500ms, 0)
    #[arg(short = 'd', long, default_value = "5s", value_parser = parse_duration)]
    pub delay: Duration,

    /// Output directory
    #[arg(short = 'o', long = "output", default_value = "out")]
    pub output_dir: PathBuf,

    /// Per-request timeout, covering connect, redirects and body download
    #[arg(short = 't', long, default_value = "30s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Maximum number of response body bytes kept per URL
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// User-Agent header sent with every request
    #[arg(long = "ua", default_value = "concurl/2.0")]
    pub user_agent: String,

    /// Print failures and skipped input lines to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Parses a duration such as `5s`, `1m30s`, `1.5s`, `250ms` or a bare `0`.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Every number needs a
/// unit except the literal `0`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut nanos = 0f64;
    let mut rest = text;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration '{}'", input));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{}' in duration '{}'", number, input))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration '{}'", input)),
            other => return Err(format!("unknown unit '{}' in duration '{}'", other, input)),
        };

        nanos += value * scale;
        rest = next;
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["concurl"]).unwrap();
        assert_eq!(cli.concurrency, 20);
        assert_eq!(cli.delay, Duration::from_secs(5));
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.timeout, Duration::from_secs(30));
        assert_eq!(cli.max_size, 10 * 1024 * 1024);
        assert!(!cli.insecure);
        assert_eq!(cli.user_agent, "concurl/2.0");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "concurl", "-c", "4", "-d", "250ms", "-o", "dump", "-t", "1m", "-v", "--insecure",
            "--ua", "bot/1.0", "--max-size", "1024",
        ])
        .unwrap();
        assert_eq!(cli.concurrency, 4);
        assert_eq!(cli.delay, Duration::from_millis(250));
        assert_eq!(cli.output_dir, PathBuf::from("dump"));
        assert_eq!(cli.timeout, Duration::from_secs(60));
        assert!(cli.verbose);
        assert!(cli.insecure);
        assert_eq!(cli.user_agent, "bot/1.0");
        assert_eq!(cli.max_size, 1024);
    }

    #[test]
    fn test_parse_compound_duration() {
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("10us"), Ok(Duration::from_micros(10)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_reject_bad_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("5 parsecs").is_err());
        assert!(parse_duration("s").is_err());
        assert!(Cli::try_parse_from(["concurl", "-d", "soon"]).is_err());
    }
}
