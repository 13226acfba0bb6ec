// src/fetch/pipeline.rs
// =============================================================================
// The per-URL fetch pipeline.
//
// Steps for one job (the first failure ends the job, nothing is retried):
// 1. Normalize: add "http://" when the line has no scheme, then parse
// 2. Extract the domain (lower-cased host, or "unknown")
// 3. Wait for the domain's rate-limit slot
// 4. GET with fixed headers over the shared, pooled client
// 5. Read at most `max_size` body bytes
// 6. Write the artifact under <output_dir>/<domain>/<hash>
//
// The caller gets back either the written `Artifact` or a `FetchError`.
//
// Rust concepts used:
// - Result + `?`: each step either hands its value to the next or returns
//   the error straight to the worker
// - map_err: turns library errors (url, reqwest) into our own FetchError
// - Arc: one client, config and limiter shared by every worker
// =============================================================================

use chrono::Local; // Timestamp for the artifact's Date: line
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url; // Parsing and host extraction

use super::artifact::{write_artifact, Artifact, Capture};
use super::error::FetchError;
use super::limiter::RateLimiter;
use crate::config::{Config, MAX_REDIRECTS};

/// Rate-limit key for URLs whose host can't be determined.
pub const UNKNOWN_DOMAIN: &str = "unknown";

// How long an unused pooled connection stays open
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

/// Builds the HTTP client shared by every worker.
///
/// Bodies are not decompressed: we send our own Accept-Encoding and store
/// whatever bytes come back.
pub fn build_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.timeout) // Covers connect, redirects and the body
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS)) // 11th redirect fails
        .danger_accept_invalid_certs(config.insecure) // --insecure
        .pool_max_idle_per_host(config.concurrency) // At most one idle connection per worker
        .pool_idle_timeout(IDLE_CONNECTION_TIMEOUT)
        .build()
}

/// Prepends `http://` unless the line already carries a scheme.
///
/// A scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )` followed by
/// `://`, in any letter case: `HTTPS://x`, `Http://x` and `ftp://x` are
/// left alone, `example.com/a` and `example.com:8080/a` are not.
pub fn normalize(raw: &str) -> String {
    if has_scheme(raw) {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    }
}

fn has_scheme(raw: &str) -> bool {
    // Everything before the first "://" must be a well-formed scheme name
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Lower-cased host of `url`, without IPv6 brackets.
///
/// Falls back to `UNKNOWN_DOMAIN` when there is no usable host, which
/// means all such URLs share one rate-limit slot.
pub fn domain_of(url: &Url) -> String {
    let host = url
        .host_str()
        .unwrap_or("")
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_lowercase();

    // The domain becomes a directory name; never let it be "", "." or "..".
    if host.chars().all(|c| c == '.') {
        UNKNOWN_DOMAIN.to_string()
    } else {
        host
    }
}

/// Runs the fetch pipeline. Cheap to share: wrap it in an `Arc` and hand
/// one to each worker.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    config: Arc<Config>,
    limiter: Arc<RateLimiter>,
}

impl Fetcher {
    pub fn new(config: Arc<Config>, limiter: Arc<RateLimiter>) -> reqwest::Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    /// Fetches one input line and writes its artifact.
    pub async fn fetch(&self, raw_url: &str) -> Result<Artifact, FetchError> {
        // Steps 1-2: the normalized text is what we hash and record
        let url_text = normalize(raw_url);
        let url = Url::parse(&url_text).map_err(|source| FetchError::InvalidUrl { source })?;
        let domain = domain_of(&url);

        // Step 3: may sleep until this domain's next slot
        self.limiter.acquire(&domain).await;
        debug!(domain = %domain, url = %url_text, "fetching");

        // Step 4: the client follows redirects itself
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT, "*/*")
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .send()
            .await
            .map_err(FetchError::from_request)?;

        // Grab the metadata before the body read consumes the response
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()) // Keep non-ASCII bytes
            .unwrap_or_default();

        // Step 5
        let body = read_capped(response, self.config.max_size).await?;

        // Step 6
        let capture = Capture {
            url: url_text,
            status,
            content_type,
            body,
            fetched_at: Local::now(),
        };
        write_artifact(&self.config.output_dir, &domain, capture).await
    }
}

// Reads the body chunk by chunk and stops once `max_size` bytes are held.
// Anything past the cap is dropped without error, whatever Content-Length
// claimed.
async fn read_capped(mut response: Response, max_size: u64) -> Result<Vec<u8>, FetchError> {
    let cap = usize::try_from(max_size).unwrap_or(usize::MAX);

    // Pre-size the buffer from Content-Length, but never past the cap
    let expected = response
        .content_length()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0);
    let mut body = Vec::with_capacity(expected.min(cap));

    // chunk() yields Ok(None) at the end of the body
    while let Some(chunk) = response.chunk().await.map_err(FetchError::ReadFailed)? {
        let room = cap - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why not response.bytes()?
//    - bytes() buffers the whole body, however large
//    - chunk() lets us stop reading the moment the cap is reached
//
// 2. Why is a 404 stored like a 200?
//    - Only transport failures are errors here; any HTTP status is a
//      legitimate answer and gets its own artifact
// -----------------------------------------------------------------------------
