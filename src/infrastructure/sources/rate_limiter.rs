//! Per-source token-bucket rate limiting
//!
//! Every upstream source gets an independent bucket sized to its per-second
//! allowance. `acquire` never fails, it only delays the caller.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use crate::domain::source::SourceKind;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter for one upstream source.
///
/// The bucket refills continuously at `rate_per_second` and its capacity
/// equals one second's allowance, so there is no bursting beyond that.
/// Waiters hold the (fair) mutex across the refill wait, which makes the
/// queue FIFO per source.
pub struct RateLimiter {
    kind: SourceKind,
    rate_per_second: u32,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(kind: SourceKind, rate_per_second: u32) -> Self {
        let rate = rate_per_second.max(1);
        Self {
            kind,
            rate_per_second: rate,
            state: Mutex::new(BucketState {
                tokens: rate as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Suspend until a call slot is available for this source.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            let capacity = self.rate_per_second as f64;
            state.tokens = (state.tokens + elapsed * capacity).min(capacity);
            state.last_refill = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return;
            }

            let deficit = 1.0 - state.tokens;
            let wait = Duration::from_secs_f64(deficit / capacity);
            debug!(source = %self.kind, wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            sleep(wait).await;
        }
    }

    pub fn rate_per_second(&self) -> u32 {
        self.rate_per_second
    }
}

/// Registry mapping each source to its limiter. No global lock across
/// sources: buckets are fully independent.
pub struct RateLimiterRegistry {
    limiters: HashMap<SourceKind, Arc<RateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new(rates: &[(SourceKind, u32)]) -> Self {
        let limiters = rates
            .iter()
            .map(|(kind, rate)| (*kind, Arc::new(RateLimiter::new(*kind, *rate))))
            .collect();
        Self { limiters }
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<RateLimiter>> {
        self.limiters.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = RateLimiter::new(SourceKind::Helius, 10);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_beyond_capacity_waits() {
        let limiter = RateLimiter::new(SourceKind::DexScreener, 1);
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Bucket is empty; the next slot opens after one full refill.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_never_exceeds_rate() {
        let rate = 10u32;
        let limiter = RateLimiter::new(SourceKind::Helius, rate);
        let mut completions = Vec::new();
        for _ in 0..35 {
            limiter.acquire().await;
            completions.push(Instant::now());
        }

        for (i, window_start) in completions.iter().enumerate() {
            let in_window = completions[i..]
                .iter()
                .take_while(|t| t.duration_since(*window_start) < Duration::from_secs(1))
                .count();
            assert!(
                in_window <= rate as usize,
                "{} completions inside a 1s window, limit {}",
                in_window,
                rate
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_do_not_share_buckets() {
        let registry =
            RateLimiterRegistry::new(&[(SourceKind::Helius, 10), (SourceKind::DexScreener, 1)]);
        let helius = registry.get(SourceKind::Helius).unwrap();
        let dexscreener = registry.get(SourceKind::DexScreener).unwrap();

        // Draining the slow bucket must not delay the fast one.
        dexscreener.acquire().await;
        let start = Instant::now();
        for _ in 0..10 {
            helius.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_are_served_fifo() {
        let limiter = Arc::new(RateLimiter::new(SourceKind::DexScreener, 1));
        limiter.acquire().await; // drain the bucket

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let the waiter enqueue before spawning the next one.
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
