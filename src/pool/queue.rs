// src/pool/queue.rs
// =============================================================================
// The job queue between the input reader and the workers.
//
// - Bounded: `send` waits when the queue is full, so a huge input file is
//   read only as fast as the workers drain it (backpressure)
// - Multi-consumer: every worker pulls from the same receiver; a job is
//   handed to exactly one of them
// - Closing: dropping the sender closes the queue. Workers keep pulling
//   until it is closed AND empty, then `next()` returns None
//
// Input lines are read through a fixed-size window: a line longer than
// MAX_LINE_BUFFER is consumed and thrown away without ever being held whole.
// =============================================================================

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::MAX_URL_LENGTH;

/// One raw URL line, consumed exactly once.
pub type Job = String;

/// Characters of an over-long line echoed in the skip notice.
const SKIP_PREVIEW_CHARS: usize = 50;

/// Bytes of one input line kept in memory. Longer lines are skipped.
const MAX_LINE_BUFFER: usize = 64 * 1024;

/// Creates a queue holding at most `capacity` pending jobs.
pub fn job_queue(capacity: usize) -> (mpsc::Sender<Job>, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let rx = JobReceiver {
        inner: Arc::new(Mutex::new(rx)),
    };
    (tx, rx)
}

/// Shared receiving end; clone one per worker.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobReceiver {
    /// Waits for the next job. `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<Job> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}

/// What the producer did with its input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub queued: usize,
    pub skipped: usize,
}

/// Reads URLs line by line from `input` and queues them.
///
/// Blank lines are ignored and lines over `MAX_URL_LENGTH` bytes are
/// skipped. Stops at end of input, on a read error, or when `cancel`
/// fires. The sender is dropped on return, which closes the queue.
pub async fn feed<R>(input: R, jobs: mpsc::Sender<Job>, cancel: &CancellationToken) -> FeedStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut input = input;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = read_bounded_line(&mut input, MAX_LINE_BUFFER) => next,
        };

        let (raw, overflowed) = match next {
            Ok(Some(InputLine::Whole(raw))) => (raw, false),
            Ok(Some(InputLine::Truncated(prefix))) => (prefix, true),
            Ok(None) => break,
            Err(e) => {
                error!("Error reading input: {}", e);
                break;
            }
        };

        let line = String::from_utf8_lossy(&raw);
        let url = line.trim();
        if url.is_empty() && !overflowed {
            continue;
        }
        if overflowed || url.len() > MAX_URL_LENGTH {
            stats.skipped += 1;
            let preview: String = url.chars().take(SKIP_PREVIEW_CHARS).collect();
            warn!("URL too long, skipping: {}...", preview);
            continue;
        }

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = jobs.send(url.to_string()) => sent,
        };
        if sent.is_err() {
            // Every worker is gone; nobody will read further jobs.
            break;
        }
        stats.queued += 1;
    }

    debug!(queued = stats.queued, skipped = stats.skipped, "input closed");
    stats
}

/// One line of input, without its trailing newline.
#[derive(Debug, PartialEq, Eq)]
enum InputLine {
    Whole(Vec<u8>),
    /// The line was longer than the limit; only its first bytes are kept.
    Truncated(Vec<u8>),
}

// Reads up to the next '\n' (or end of input), holding at most `limit`
// bytes. Returns Ok(None) at end of input.
async fn read_bounded_line<R>(input: &mut R, limit: usize) -> std::io::Result<Option<InputLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut truncated = false;
    let mut read_any = false;

    loop {
        let (used, at_newline) = {
            let available = input.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            read_any = true;

            let newline = available.iter().position(|&b| b == b'\n');
            let segment = &available[..newline.unwrap_or(available.len())];

            let room = limit.saturating_sub(line.len());
            if segment.len() > room {
                truncated = true;
            }
            line.extend_from_slice(&segment[..segment.len().min(room)]);

            (newline.map_or(available.len(), |at| at + 1), newline.is_some())
        };

        input.consume(used);
        if at_newline {
            break;
        }
    }

    if !read_any {
        return Ok(None);
    }
    Ok(Some(if truncated {
        InputLine::Truncated(line)
    } else {
        InputLine::Whole(line)
    }))
}
