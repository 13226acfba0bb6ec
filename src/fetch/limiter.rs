// src/fetch/limiter.rs
// =============================================================================
// Per-domain politeness: requests to one domain start at least `delay` apart,
// while requests to different domains never wait on each other.
//
// How it works:
// 1. Lock the domain map
// 2. Reserve the next free start slot for the domain (now, or later if the
//    previous request was too recent) and push the domain's next slot out
//    by `delay`
// 3. Unlock, then sleep until the reserved slot
//
// Because the lock is released before sleeping, a worker waiting on a slow
// domain never holds up workers talking to other domains. Because slots are
// reserved under the lock, two workers waiting on the same domain can't both
// wake up at the same instant.
// =============================================================================

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    // domain -> earliest instant a new request may start
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_allowed: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until a request to `domain` may start.
    ///
    /// With a zero delay this returns immediately.
    pub async fn acquire(&self, domain: &str) {
        let slot = self.reserve(domain);
        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Claims the next start slot for `domain` without waiting for it.
    fn reserve(&self, domain: &str) -> Instant {
        let now = Instant::now();

        // The map is only touched inside this block, never across an await,
        // so a std mutex is enough.
        let mut next_allowed = self
            .next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let slot = match next_allowed.get(domain) {
            Some(&next) if next > now => next,
            _ => now,
        };
        next_allowed.insert(domain.to_string(), slot + self.delay);
        slot
    }

    /// Number of distinct domains seen so far.
    pub fn domain_count(&self) -> usize {
        self.next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_passes_immediately() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire("example.com").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.domain_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_domain_waits_for_delay() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire("example.com").await;
        limiter.acquire("example.com").await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_domains_do_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire("a.example").await;
        limiter.acquire("b.example").await;
        limiter.acquire("c.example").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.domain_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire("example.com").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_delay_is_not_charged_again() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.acquire("example.com").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let start = Instant::now();
        limiter.acquire("example.com").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_are_spaced() {
        let delay = Duration::from_secs(1);
        let limiter = Arc::new(RateLimiter::new(delay));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire("example.com").await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_domain_does_not_block_others() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(10)));
        limiter.acquire("slow.example").await;

        // This waiter sleeps ~10s on slow.example...
        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire("slow.example").await })
        };
        tokio::task::yield_now().await;

        // ...while another domain still goes straight through.
        let start = Instant::now();
        limiter.acquire("fast.example").await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        waiter.await.unwrap();
    }
}
