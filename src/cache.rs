use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Raw payload of a fetched resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Html(String),
    Json(serde_json::Value),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Payload,
    expires_at: Instant,
}

/// Memoizes remote fetches, keyed by the literal URL that was fetched
/// (page URL or oEmbed endpoint URL), never by the resolver's input URL.
///
/// Bounded by entry count (least-recently-used eviction) and by a per-entry
/// time-to-live. Cloning yields another handle to the same storage. Nothing
/// is persisted.
#[derive(Clone)]
pub struct ResolutionCache {
    inner: Arc<Mutex<LruCache<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        // entries are plain data, a panic elsewhere cannot leave them half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        let mut cache = self.lock();

        let expired = match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                log::debug!("cache=hit key={key}");
                return Some(entry.payload.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            log::debug!("cache=expired key={key}");
            cache.pop(key);
        }

        None
    }

    pub fn put(&self, key: &str, payload: Payload) {
        let entry = CacheEntry {
            payload,
            expires_at: Instant::now() + self.ttl,
        };

        if let Some((evicted, _)) = self.lock().push(key.to_string(), entry) {
            if evicted != key {
                log::debug!("cache=evict key={evicted}");
            }
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut cache = self.lock();
        let now = Instant::now();

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(s: &str) -> Payload {
        Payload::Html(s.to_string())
    }

    #[test]
    fn test_get_after_put() {
        let cache = ResolutionCache::new(10, Duration::from_secs(60));
        assert!(cache.get("https://a.example/").is_none());

        cache.put("https://a.example/", html("<html></html>"));
        assert_eq!(cache.get("https://a.example/"), Some(html("<html></html>")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_on_overflow() {
        let cache = ResolutionCache::new(2, Duration::from_secs(60));
        cache.put("a", html("a"));
        cache.put("b", html("b"));

        // touch "a" so "b" becomes least recently used
        assert!(cache.get("a").is_some());
        cache.put("c", html("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let cache = ResolutionCache::new(10, Duration::ZERO);
        cache.put("a", html("a"));
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResolutionCache::new(10, Duration::ZERO);
        cache.put("a", html("a"));
        cache.put("b", Payload::Json(serde_json::json!({"title": "x"})));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ResolutionCache::new(10, Duration::from_secs(60));
        cache.put("a", html("first"));
        cache.put("a", html("second"));
        assert_eq!(cache.get("a"), Some(html("second")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ResolutionCache::new(10, Duration::from_secs(60));
        let other = cache.clone();
        cache.put("a", html("a"));
        assert!(other.get("a").is_some());
        other.put("b", html("b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = ResolutionCache::new(0, Duration::from_secs(60));
        assert_eq!(cache.capacity(), 1);
    }
}
