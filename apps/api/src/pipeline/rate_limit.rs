//! Fixed-window request rate limiting (in-memory).
//!
//! Windows live only in process memory and are not shared across instances
//! or restarts — this is a best-effort abuse guard, not a billing-grade
//! limiter. Expiry is lazy: a stale window is replaced on the next check
//! for its key, and a purge sweeps expired entries only when the store
//! grows past a size threshold.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Expired windows are purged once the store tracks this many keys.
const PURGE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, floored at zero.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.reset_at - now).num_seconds().max(0)
    }
}

/// Process-wide window store. Passed explicitly via `AppState`; the mutex
/// linearizes read-modify-write so concurrent checks never lose increments.
#[derive(Default)]
pub struct RateLimiterStore {
    windows: Mutex<HashMap<String, WindowRecord>>,
}

impl RateLimiterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitDecision {
        self.check_at(Utc::now(), key, max_requests, window)
    }

    /// Time-parameterized variant backing [`check`](Self::check);
    /// lets tests drive the window boundary without sleeping.
    pub fn check_at(
        &self,
        now: DateTime<Utc>,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> RateLimitDecision {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        if let Some(record) = windows.get_mut(key) {
            if now <= record.reset_at {
                if record.count >= max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: record.reset_at,
                    };
                }
                record.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: max_requests - record.count,
                    reset_at: record.reset_at,
                };
            }
        }

        // No window, or the stored one has expired: start fresh
        let reset_at = now + window;
        windows.insert(
            key.to_string(),
            WindowRecord {
                count: 1,
                reset_at,
            },
        );

        if windows.len() > PURGE_THRESHOLD {
            windows.retain(|_, record| now <= record.reset_at);
        }

        RateLimitDecision {
            allowed: true,
            remaining: max_requests.saturating_sub(1),
            reset_at,
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.lock().expect("rate limiter lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_saturation_then_fresh_window() {
        let store = RateLimiterStore::new();
        let window = Duration::milliseconds(1000);
        let t0 = at(0);

        // Three allowed, fourth denied
        for expected_remaining in [2, 1, 0] {
            let decision = store.check_at(t0, "k", 3, window);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        let denied = store.check_at(t0, "k", 3, window);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, at(1000));

        // After the window elapses the next check opens a fresh window
        let fresh = store.check_at(at(1001), "k", 3, window);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 2);
        assert_eq!(fresh.reset_at, at(2001));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = RateLimiterStore::new();
        let window = Duration::seconds(3600);
        let t0 = at(0);

        store.check_at(t0, "a", 1, window);
        let denied = store.check_at(t0, "a", 1, window);
        assert!(!denied.allowed);

        let other = store.check_at(t0, "b", 1, window);
        assert!(other.allowed, "key b has its own window");
    }

    #[test]
    fn test_denied_check_does_not_consume_count() {
        let store = RateLimiterStore::new();
        let window = Duration::seconds(10);
        let t0 = at(0);

        store.check_at(t0, "k", 1, window);
        for _ in 0..5 {
            assert!(!store.check_at(t0, "k", 1, window).allowed);
        }
        // Window expiry still restores service
        assert!(store.check_at(at(10_001), "k", 1, window).allowed);
    }

    #[test]
    fn test_boundary_instant_is_still_inside_window() {
        let store = RateLimiterStore::new();
        let window = Duration::milliseconds(1000);

        store.check_at(at(0), "k", 1, window);
        let at_reset = store.check_at(at(1000), "k", 1, window);
        assert!(!at_reset.allowed, "reset instant itself is inside the window");
    }

    #[test]
    fn test_purge_bounds_tracked_keys() {
        let store = RateLimiterStore::new();
        let window = Duration::milliseconds(1);

        for i in 0..=PURGE_THRESHOLD {
            store.check_at(at(0), &format!("k{i}"), 1, window);
        }
        assert!(store.tracked_keys() > PURGE_THRESHOLD);

        // All earlier windows are expired by now; the next insert purges them
        store.check_at(at(10), "fresh", 1, window);
        assert!(store.tracked_keys() <= 2);
    }
}
