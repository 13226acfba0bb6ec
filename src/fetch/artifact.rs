// src/fetch/artifact.rs
// =============================================================================
// Persisting a fetched response as a content-addressed artifact file.
//
// Layout:  <output_dir>/<domain>/<first 16 hex chars of sha256(url)>
//
// File contents:
//   URL: <url>
//   Status: <code>
//   Content-Type: <type>
//   Content-Length: <captured body bytes>
//   Date: <RFC 3339 timestamp>
//   ------
//   <blank line>
//   <raw body bytes>
//
// Two URLs whose hashes share the 16-character prefix map to the same file;
// whichever write finishes last wins. Writes go through a temp file plus an
// atomic rename, so the file is always one complete artifact.
// =============================================================================

use chrono::{DateTime, Local, SecondsFormat};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::error::FetchError;

/// Hex characters of the SHA-256 digest kept in the file name.
pub const HASH_PREFIX_LEN: usize = 16;

/// Line separating the metadata header from the body.
pub const HEADER_DELIMITER: &str = "------";

/// A response captured in memory, ready to be written out.
#[derive(Debug, Clone)]
pub struct Capture {
    pub url: String,
    pub status: u16,
    pub content_type: String,
    /// Body bytes, already truncated to the size cap
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Local>,
}

/// Where a capture ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub status: u16,
    pub url: String,
}

impl Artifact {
    /// The progress record printed for this artifact: `<path> <status> <url>`.
    pub fn progress_line(&self) -> String {
        format!("{} {} {}", self.path.display(), self.status, self.url)
    }
}

/// First `HASH_PREFIX_LEN` hex characters of the SHA-256 of `url`.
pub fn url_hash(url: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(url.as_bytes()));
    digest.truncate(HASH_PREFIX_LEN);
    digest
}

pub fn artifact_path(output_dir: &Path, domain: &str, url: &str) -> PathBuf {
    output_dir.join(domain).join(url_hash(url))
}

/// Renders the header block followed by the raw body.
pub fn render(capture: &Capture) -> Vec<u8> {
    let header = format!(
        "URL: {}\nStatus: {}\nContent-Type: {}\nContent-Length: {}\nDate: {}\n{}\n\n",
        capture.url,
        capture.status,
        capture.content_type,
        capture.body.len(),
        capture.fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        HEADER_DELIMITER,
    );

    let mut out = Vec::with_capacity(header.len() + capture.body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&capture.body);
    out
}

/// Writes `capture` under `output_dir/domain/`, creating the directory
/// on demand.
pub async fn write_artifact(
    output_dir: &Path,
    domain: &str,
    capture: Capture,
) -> Result<Artifact, FetchError> {
    let dir = output_dir.join(domain);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FetchError::write(&dir, e))?;

    let path = artifact_path(output_dir, domain, &capture.url);
    let contents = render(&capture);

    // tempfile is synchronous, so do the write + rename off the runtime.
    let target = path.clone();
    tokio::task::spawn_blocking(move || persist_atomically(&dir, &target, &contents))
        .await
        .map_err(|e| FetchError::write(&path, std::io::Error::other(e)))?
        .map_err(|e| FetchError::write(&path, e))?;

    Ok(Artifact {
        path,
        status: capture.status,
        url: capture.url,
    })
}

fn persist_atomically(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn capture(url: &str, body: &[u8]) -> Capture {
        Capture {
            url: url.to_string(),
            status: 200,
            content_type: "text/plain".to_string(),
            body: body.to_vec(),
            fetched_at: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_url_hash_is_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(url_hash("abc"), "ba7816bf8f01cfea");
        assert_eq!(url_hash("http://example.com/a").len(), HASH_PREFIX_LEN);
    }

    #[test]
    fn test_artifact_path_layout() {
        let path = artifact_path(Path::new("out"), "example.com", "http://example.com/a");
        assert_eq!(
            path,
            Path::new("out")
                .join("example.com")
                .join(url_hash("http://example.com/a"))
        );
    }

    #[test]
    fn test_render_header_and_body() {
        let rendered = render(&capture("http://example.com/a", b"hello"));
        let text = String::from_utf8(rendered).unwrap();

        let (header, body) = text.split_once("------\n\n").unwrap();
        assert_eq!(body, "hello");
        assert!(header.starts_with("URL: http://example.com/a\nStatus: 200\n"));
        assert!(header.contains("Content-Type: text/plain\n"));
        assert!(header.contains("Content-Length: 5\n"));
        assert!(header.contains("Date: 2024-05-01T12:30:00"));
    }

    #[test]
    fn test_render_keeps_binary_body() {
        let body = [0u8, 159, 146, 150, b'\n', 255];
        let rendered = render(&capture("http://example.com/bin", &body));
        assert!(rendered.ends_with(&body));
    }

    #[test]
    fn test_progress_line_format() {
        let artifact = Artifact {
            path: PathBuf::from("out/example.com/0123456789abcdef"),
            status: 404,
            url: "http://example.com/missing".to_string(),
        };
        assert_eq!(
            artifact.progress_line(),
            "out/example.com/0123456789abcdef 404 http://example.com/missing"
        );
    }

    #[tokio::test]
    async fn test_write_creates_domain_directory() {
        let out = TempDir::new().unwrap();
        let artifact = write_artifact(out.path(), "example.com", capture("http://example.com/a", b"hello"))
            .await
            .unwrap();

        assert_eq!(artifact.path, artifact_path(out.path(), "example.com", "http://example.com/a"));
        let written = std::fs::read(&artifact.path).unwrap();
        assert!(written.ends_with(b"------\n\nhello"));

        // Nothing but the artifact itself is left behind.
        let entries = std::fs::read_dir(out.path().join("example.com")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_colliding_writes_keep_one_complete_artifact() {
        let out = TempDir::new().unwrap();
        let big_a = vec![b'a'; 256 * 1024];
        let big_b = vec![b'b'; 256 * 1024];

        // Same URL => same path, standing in for a hash-prefix collision.
        let first = write_artifact(out.path(), "example.com", capture("http://example.com/x", &big_a));
        let second = write_artifact(out.path(), "example.com", capture("http://example.com/x", &big_b));
        let (first, second) = tokio::join!(first, second);
        let path = first.unwrap().path;
        assert_eq!(path, second.unwrap().path);

        let written = std::fs::read(&path).unwrap();
        let expected_a = render(&capture("http://example.com/x", &big_a));
        let expected_b = render(&capture("http://example.com/x", &big_b));
        assert!(written == expected_a || written == expected_b);
    }

    #[tokio::test]
    async fn test_write_fails_when_root_is_a_file() {
        let out = TempDir::new().unwrap();
        let blocker = out.path().join("root");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = write_artifact(&blocker, "example.com", capture("http://example.com/a", b""))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::WriteFailed { .. }));
    }
}
