// src/fetch/mod.rs
// =============================================================================
// Fetching one URL and persisting what came back.
//
// Submodules:
// - limiter: per-domain spacing between request starts
// - pipeline: normalize -> rate-limit -> GET -> capped read -> persist
// - artifact: the on-disk `<domain>/<hash>` file format
// - error: the per-job error type
// =============================================================================

mod artifact;
mod error;
mod limiter;
mod pipeline;

pub use artifact::Artifact;
pub use limiter::RateLimiter;
pub use pipeline::Fetcher;
