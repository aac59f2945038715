// src/infra/cache.rs — Time-boxed memoization for tool provider responses
//
// Entries expire lazily: an over-TTL entry is removed on the next lookup
// and reported absent. No background sweep and no size bound — TTL-driven
// turnover is the only eviction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    created_at: Instant,
    value: String,
}

pub struct ResponseCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a key, expiring it first if it is older than the TTL.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                tracing::debug!(key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            Entry {
                created_at: Instant::now(),
                value,
            },
        );
    }

    /// Number of entries currently held (including not-yet-expired ones).
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("quote:AAPL", "payload".into());
        assert_eq!(cache.get("quote:AAPL"), Some("payload".into()));
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        assert_eq!(cache.get("quote:MSFT"), None);
    }

    #[test]
    fn test_expired_entry_removed() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.put("news:tesla", "articles".into());
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("news:tesla"), None);
        // Lazy expiry actually removed the entry
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("k", "old".into());
        cache.put("k", "new".into());
        assert_eq!(cache.get("k"), Some("new".into()));
        assert_eq!(cache.len(), 1);
    }
}
