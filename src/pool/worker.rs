// src/pool/worker.rs
// =============================================================================
// Fixed-size pool of fetch workers.
//
// Each worker loops: take one job, run it through the fetch pipeline, report
// the result, repeat. A failed job is logged and forgotten; the worker goes
// straight on to the next one. Workers exit once the queue is closed and
// empty.
//
// After a shutdown request the workers still drain the queue, but discard
// each remaining job instead of fetching it.
//
// Rust concepts used:
// - Traits: ProgressSink lets the run report to stdout, or to memory in tests
// - tokio::spawn: every worker is its own task on the runtime
// - while let: loop until the queue hands back None
// =============================================================================

use std::io::Write; // Brings writeln! support for the stdout lock
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::queue::JobReceiver;
use crate::fetch::{Artifact, Fetcher};

/// Receives one record per successfully written artifact.
///
/// Send + Sync because every worker holds the same sink.
pub trait ProgressSink: Send + Sync {
    fn record(&self, artifact: &Artifact);
}

/// Prints `<path> <status> <url>` lines on stdout.
#[derive(Debug, Default)]
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn record(&self, artifact: &Artifact) {
        // One locked write per line keeps lines from different workers whole.
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", artifact.progress_line()) {
            // Usually a closed pipe (e.g. `| head`); the fetch itself succeeded
            debug!("Could not write progress line: {}", e);
        }
    }
}

/// Starts `count` workers pulling from `jobs`.
pub fn spawn_workers(
    count: usize,
    fetcher: Arc<Fetcher>,
    jobs: JobReceiver,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            // Each task gets its own handles to the shared pieces
            let fetcher = Arc::clone(&fetcher);
            let jobs = jobs.clone();
            let progress = Arc::clone(&progress);
            let cancel = cancel.clone();
            tokio::spawn(async move { work(id, fetcher, jobs, progress, cancel).await })
        })
        .collect()
}

async fn work(
    id: usize,
    fetcher: Arc<Fetcher>,
    jobs: JobReceiver,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) {
    // next() returns None only once the producer is done and the queue is empty
    while let Some(raw_url) = jobs.next().await {
        // Keep draining after Ctrl-C so the producer never blocks, but don't fetch
        if cancel.is_cancelled() {
            debug!(worker = id, url = %raw_url, "shutdown requested, discarding job");
            continue;
        }

        match fetcher.fetch(&raw_url).await {
            Ok(artifact) => progress.record(&artifact),
            // Shown only with --verbose; the job is dropped either way
            Err(e) => warn!("Error processing {}: {}", raw_url, e),
        }
    }
    debug!(worker = id, "queue drained, worker exiting");
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why Arc<dyn ProgressSink> instead of a generic parameter?
//    - The sink is picked at runtime (stdout in the binary, memory in tests)
//      and shared by all workers; one trait object behind an Arc covers both
//
// 2. Why does a worker exit only on None?
//    - A closed-but-not-empty queue still has jobs to hand out; recv() keeps
//      returning them until the buffer is empty
// -----------------------------------------------------------------------------
