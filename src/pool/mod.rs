// src/pool/mod.rs
// =============================================================================
// The concurrent fetch run: one producer, a bounded queue, N workers.
//
// Order of events in `run`:
// 1. Start every worker (they block on the empty queue)
// 2. Feed input lines into the queue until EOF or shutdown
// 3. Close the queue by dropping the sender
// 4. Wait for every worker to drain the queue and exit
//
// Job failures never surface here; `run` finishes once the input has been
// fully handled, whatever happened to the individual jobs.
// =============================================================================

mod queue;
mod worker;

pub use queue::FeedStats;
pub use worker::{ProgressSink, StdoutProgress};

use queue::{feed, job_queue};
use worker::spawn_workers;

use futures::future::join_all;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::Config;
use crate::fetch::Fetcher;

/// Fetches every URL read from `input` and waits until all of them are done.
pub async fn run<R>(
    config: &Config,
    fetcher: Arc<Fetcher>,
    input: R,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
) -> FeedStats
where
    R: AsyncBufRead + Unpin,
{
    let (jobs_tx, jobs_rx) = job_queue(config.queue_capacity());

    // Workers first, so the queue has consumers before it starts filling.
    let workers = spawn_workers(config.concurrency, fetcher, jobs_rx, progress, cancel.clone());

    let stats = feed(input, jobs_tx, &cancel).await;

    for result in join_all(workers).await {
        if let Err(e) = result {
            error!("Worker task failed: {}", e);
        }
    }

    stats
}
