//! Fixed-window request throttle.
//!
//! Counts acquisitions inside a fixed window starting at the first
//! acquisition; when the window is full, callers suspend until it rolls
//! over. Brief bursts straddling a window boundary are accepted — that is
//! the fixed-window tradeoff, not a sliding log.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self {
            limit: limit.max(1),
            window: Duration::from_millis(window_ms.max(1)),
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Suspend until a slot is available under `limit` per window, then
    /// consume it. Never fails; exhausted capacity means waiting, not
    /// erroring.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                if now.duration_since(state.window_start) >= self.window {
                    state.window_start = now;
                    state.count = 0;
                }
                if state.count < self.limit {
                    state.count += 1;
                    return;
                }
                state.window_start + self.window - now
            };
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_acquisitions_within_limit_do_not_wait() {
        let limiter = RateLimiter::new(5, 1_000);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now().duration_since(start), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_limit_acquisition_defers_to_next_window() {
        let limiter = RateLimiter::new(3, 1_000);
        for _ in 0..3 {
            limiter.acquire().await;
        }

        let start = Instant::now();
        limiter.acquire().await;
        let waited = Instant::now().duration_since(start);
        assert!(
            waited >= Duration::from_millis(1_000),
            "4th acquisition completed after {waited:?}, inside the window"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_idle_gap() {
        let limiter = RateLimiter::new(2, 1_000);
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_millis(1_500)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now().duration_since(start), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_more_than_limit_complete_per_window() {
        let limiter = std::sync::Arc::new(RateLimiter::new(2, 1_000));
        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut completions = Vec::new();
        for handle in handles {
            completions.push(handle.await.unwrap());
        }
        completions.sort();

        // 5 acquisitions at limit 2 need at least 3 windows; every pair of
        // completions two apart must span at least one full window.
        for pair in completions.windows(3) {
            assert!(pair[2].duration_since(pair[0]) >= Duration::from_millis(1_000));
        }
    }
}
