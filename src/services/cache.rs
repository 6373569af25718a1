//! Namespaced in-memory cache with per-namespace TTLs
//!
//! Expiry is checked lazily on read; there is no background sweep. The single
//! mutex guards only the map itself; producing a value to cache (a scan, a
//! catalog fetch) must happen outside the lock, with the result stored via
//! `set` afterwards. Last writer wins on concurrent population; correctness
//! is restored within one TTL window. No size-based eviction: keys are few
//! and stable (one per content root / catalog source).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL cache keyed by `namespace:key`, one instance per value type
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    namespace_ttls: HashMap<String, Duration>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            namespace_ttls: HashMap::new(),
        }
    }

    /// Register a default TTL for one namespace
    pub fn with_namespace_ttl(mut self, namespace: &str, ttl: Duration) -> Self {
        self.namespace_ttls.insert(namespace.to_string(), ttl);
        self
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{}:{}", namespace, key)
    }

    fn ttl_for(&self, namespace: &str, ttl: Option<Duration>) -> Duration {
        ttl.or_else(|| self.namespace_ttls.get(namespace).copied())
            .unwrap_or(self.default_ttl)
    }

    /// Get a value if present and not expired. An expired entry is removed
    /// by the read that discovers it.
    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        let full = Self::full_key(namespace, key);
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&full) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&full);
                None
            }
            None => None,
        }
    }

    /// Store a value; `ttl` of None uses the namespace default.
    pub fn set(&self, namespace: &str, key: &str, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + self.ttl_for(namespace, ttl);
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(Self::full_key(namespace, key), CacheEntry { value, expires_at });
    }

    /// Remove one entry. Returns true if it was present.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(&Self::full_key(namespace, key)).is_some()
    }

    /// Remove all entries whose full key starts with `prefix`.
    /// Returns the number removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        keys.len()
    }

    /// Drop all cached values
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn get_returns_stored_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("content", "root", 42u32, None);
        assert_eq!(cache.get("content", "root"), Some(42));
    }

    #[test]
    fn missing_key_is_none() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("content", "nope"), None);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.set("content", "root", 1u32, None);
        sleep(Duration::from_millis(25));
        assert_eq!(cache.get("content", "root"), None);
        // Entry is gone, not just hidden
        assert!(!cache.delete("content", "root"));
    }

    #[test]
    fn explicit_ttl_overrides_default() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.set("content", "root", 1u32, Some(Duration::from_secs(60)));
        sleep(Duration::from_millis(25));
        assert_eq!(cache.get("content", "root"), Some(1));
    }

    #[test]
    fn namespace_ttl_overrides_default() {
        let cache = TtlCache::new(Duration::from_secs(60))
            .with_namespace_ttl("short", Duration::from_millis(10));
        cache.set("short", "a", 1u32, None);
        cache.set("long", "a", 2u32, None);
        sleep(Duration::from_millis(25));
        assert_eq!(cache.get("short", "a"), None);
        assert_eq!(cache.get("long", "a"), Some(2));
    }

    #[test]
    fn invalidate_prefix_counts_removed() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("content", "a", 1u32, None);
        cache.set("content", "b", 2u32, None);
        cache.set("catalog", "custom", 3u32, None);
        assert_eq!(cache.invalidate_prefix("content:"), 2);
        assert_eq!(cache.get("content", "a"), None);
        assert_eq!(cache.get("catalog", "custom"), Some(3));
    }

    #[test]
    fn delete_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("ns", "k", 1u32, None);
        assert!(cache.delete("ns", "k"));
        assert!(!cache.delete("ns", "k"));
        cache.set("ns", "k", 1u32, None);
        cache.clear();
        assert_eq!(cache.get("ns", "k"), None);
    }
}
