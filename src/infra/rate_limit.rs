// src/infra/rate_limit.rs — Per-client sliding-window admission control

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window request counter keyed by client address.
///
/// Each admission check prunes timestamps older than the window, then
/// admits iff the remaining count is under the quota. State lives only
/// for the process lifetime.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
    quota: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(quota: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            quota,
            window,
        }
    }

    /// Window length in whole seconds, for the 429 retry-after hint.
    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Admit or reject a request from `key` at the current instant.
    pub fn try_admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    /// Deterministic seam: admission check at an explicit instant.
    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let stamps = windows.entry(key.to_string()).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);

        if stamps.len() >= self.quota {
            tracing::info!(client = %key, count = stamps.len(), "Rate limit rejection");
            return false;
        }
        stamps.push(now);
        true
    }
}
