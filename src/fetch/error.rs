// src/fetch/error.rs
// =============================================================================
// Everything that can go wrong while fetching a single URL.
//
// A `FetchError` only ever describes one job. The worker loop logs it (in
// verbose mode) and moves on; nothing here aborts the pool.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

use crate::config::MAX_REDIRECTS;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The input line could not be parsed as a URL
    #[error("invalid URL: {source}")]
    InvalidUrl {
        #[source]
        source: url::ParseError,
    },

    /// Transport failure: DNS, connect, TLS, timeout, ...
    #[error("request failed ({kind}): {source}")]
    RequestFailed {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The redirect chain went past the limit
    #[error("too many redirects (limit is {limit})")]
    TooManyRedirects { limit: usize },

    /// The body stream broke before we reached the size cap
    #[error("reading response: {0}")]
    ReadFailed(#[source] reqwest::Error),

    /// Directory creation or artifact write failed
    #[error("writing {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Sorts a `send()` failure into the redirect case or a labelled
    /// transport failure.
    pub fn from_request(error: reqwest::Error) -> Self {
        if error.is_redirect() {
            return FetchError::TooManyRedirects {
                limit: MAX_REDIRECTS,
            };
        }

        let kind = if error.is_timeout() {
            "timeout"
        } else if is_tls_error(&error) {
            "tls"
        } else if error.is_connect() {
            "connect"
        } else {
            "transport"
        };

        FetchError::RequestFailed {
            kind,
            source: error,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

// reqwest has no dedicated TLS predicate, so look through the source chain.
// The top-level message embeds the URL, so start one level down.
fn is_tls_error(error: &reqwest::Error) -> bool {
    use std::error::Error as _;

    let mut source = error.source();
    while let Some(err) = source {
        let text = err.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = err.source();
    }
    false
}
