//! Fixed-window rate limiter for the login/claim endpoints: `N` requests
//! per client IP per window. A `DashMap` keyed by client identity, same
//! concurrent-map idiom as `session::SessionStore`, each entry a small
//! counter protected by its own window instead of a shared lock.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: DashMap<String, Mutex<Window>>,
    limit: u32,
    period: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32, period: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            period,
        }
    }

    /// Record a request from `key`, returning `true` if it is within limit.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Window { started_at: now, count: 0 }));
        let mut window = entry.lock().expect("rate limiter mutex poisoned");
        if now.duration_since(window.started_at) >= self.period {
            window.started_at = now;
            window.count = 0;
        }
        window.count += 1;
        window.count <= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(3, Duration::from_secs(30));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn separate_keys_have_separate_budgets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(30));
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
    }
}
