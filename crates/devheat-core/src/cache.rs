//! Key-value cache with TTL (Time-To-Live) support.
//!
//! [`TtlCache`] stores values under string keys with a per-entry expiry.
//! Reads through [`TtlCache::get`] evict expired entries lazily, and
//! [`TtlCache::sweep`] removes them proactively. Entries stored with
//! [`TtlCache::set`] are kept past expiry for a bounded retention window so
//! callers can fall back to stale data with [`TtlCache::get_stale`] when a
//! fresh fetch fails; entries stored with [`TtlCache::set_without_retention`]
//! are swept as soon as they expire.
//!
//! All keys share one namespace. Callers prefix keys by domain, e.g.
//! `github:<identity>` or `heatmap:<...>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::activity::HeatmapResponse;

/// How long expired entries stay available for stale fallback by default.
pub const DEFAULT_STALE_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Expiry used when a TTL would overflow the monotonic clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache entry containing a value and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// When the entry expires (monotonic clock).
    expires_at: Instant,
    /// How long the entry is kept past expiry for stale reads.
    retention: Duration,
}

impl<V> CacheEntry<V> {
    /// Creates a new cache entry with the given TTL.
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            stored_at: Utc::now(),
            expires_at: now
                .checked_add(ttl)
                .unwrap_or_else(|| now + FAR_FUTURE),
            retention: Duration::ZERO,
        }
    }

    /// Builder: keep the entry past expiry for `retention`.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Returns true if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    /// Returns true if the entry is past expiry plus its retention.
    fn is_past_retention(&self, now: Instant) -> bool {
        match self.expires_at.checked_add(self.retention) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}

/// Result of a non-evicting cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// The entry exists and has not expired.
    Fresh(V),
    /// The entry exists but has expired.
    Stale(V),
    /// No entry exists.
    Miss,
}

impl<V> Lookup<V> {
    /// Returns the value only if it is fresh.
    pub fn fresh(self) -> Option<V> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Stale(_) | Self::Miss => None,
        }
    }

    /// Returns the value whether fresh or stale.
    pub fn any(self) -> Option<V> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }
}

/// Thread-safe key-value cache with per-entry TTL.
///
/// Every operation takes the internal lock for a single map operation, so
/// the cache can be shared behind an [`Arc`] between request handlers and
/// the background sweeper.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// How long entries stored with [`TtlCache::set`] are retained for
    /// stale reads.
    stale_retention: Duration,
    /// Cache entries keyed by namespaced key.
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_RETENTION)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Creates a new cache that keeps expired entries for `stale_retention`.
    pub fn new(stale_retention: Duration) -> Self {
        Self {
            stale_retention,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a value by key, only if not expired.
    ///
    /// An expired entry is evicted as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        match entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => {}
        }
        entries.remove(key);
        trace!(key = %key, "Evicted expired cache entry on read");
        None
    }

    /// Looks up a key without evicting, reporting whether it is fresh.
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        match self.entries().get(key) {
            Some(entry) if entry.is_expired() => Lookup::Stale(entry.value.clone()),
            Some(entry) => Lookup::Fresh(entry.value.clone()),
            None => Lookup::Miss,
        }
    }

    /// Gets a value by key regardless of expiry.
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.lookup(key).any()
    }

    /// Inserts or replaces a value with the given TTL, retained past expiry
    /// for the stale retention window.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), CacheEntry::new(value, ttl).with_retention(self.stale_retention));
    }

    /// Inserts or replaces a value that the next sweep after expiry removes.
    pub fn set_without_retention(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), CacheEntry::new(value, ttl));
    }

    fn insert(&self, key: String, entry: CacheEntry<V>) {
        debug!(
            key = %key,
            retention_secs = entry.retention.as_secs(),
            "Stored cache entry"
        );
        self.entries().insert(key, entry);
    }

    /// Removes an entry.
    pub fn delete(&self, key: &str) -> Option<V> {
        let entry = self.entries().remove(key);
        if entry.is_some() {
            debug!(key = %key, "Removed cache entry");
        }
        entry.map(|entry| entry.value)
    }

    /// Clears all cache entries.
    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        debug!(count = count, "Cleared all cache entries");
    }

    /// Removes all entries past their expiry plus their retention window.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = !entry.is_past_retention(now);
            if !keep {
                trace!(key = %key, "Sweeping expired cache entry");
            }
            keep
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted = evicted, remaining = entries.len(), "Swept expired cache entries");
        }
        evicted
    }

    /// Returns the number of cache entries, including retained stale ones.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Values stored in the shared response cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// A raw upstream payload, cached per provider identity.
    Upstream(Arc<serde_json::Value>),
    /// A merged heatmap response, cached per merge key.
    Heatmap(Arc<HeatmapResponse>),
}

impl CacheValue {
    /// Returns the raw upstream payload, if this is one.
    pub fn into_upstream(self) -> Option<Arc<serde_json::Value>> {
        match self {
            Self::Upstream(payload) => Some(payload),
            Self::Heatmap(_) => None,
        }
    }

    /// Returns the heatmap response, if this is one.
    pub fn into_heatmap(self) -> Option<Arc<HeatmapResponse>> {
        match self {
            Self::Heatmap(response) => Some(response),
            Self::Upstream(_) => None,
        }
    }
}

/// The process-wide cache shared by providers and the aggregator.
pub type ResponseCache = TtlCache<CacheValue>;

/// Shared handle to the response cache.
pub type SharedCache = Arc<ResponseCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn cache() -> TtlCache<String> {
        TtlCache::new(Duration::ZERO)
    }

    #[test]
    fn cache_entry_expiration() {
        let entry = CacheEntry::new("value", Duration::from_millis(50));

        assert!(!entry.is_expired());
        thread::sleep(Duration::from_millis(60));
        assert!(entry.is_expired());
    }

    #[test]
    fn cache_set_and_get() {
        let cache = cache();

        cache.set("github:octocat", "payload".to_string(), Duration::from_secs(60));

        assert_eq!(cache.get("github:octocat"), Some("payload".to_string()));
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_evicts_expired_entry() {
        let cache = cache();
        cache.set("key", "value".to_string(), Duration::from_millis(20));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("key"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn lookup_does_not_evict() {
        let cache = cache();
        cache.set("key", "value".to_string(), Duration::from_millis(20));
        assert_eq!(cache.lookup("key"), Lookup::Fresh("value".to_string()));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.lookup("key"), Lookup::Stale("value".to_string()));
        assert_eq!(cache.get_stale("key"), Some("value".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("missing"), Lookup::Miss);
    }

    #[test]
    fn set_replaces_and_refreshes() {
        let cache = cache();
        cache.set("key", "old".to_string(), Duration::from_millis(20));
        thread::sleep(Duration::from_millis(30));

        cache.set("key", "new".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("key"), Some("new".to_string()));
    }

    #[test]
    fn cache_delete() {
        let cache = cache();
        cache.set("key", "value".to_string(), Duration::from_secs(60));

        assert_eq!(cache.delete("key"), Some("value".to_string()));
        assert_eq!(cache.delete("key"), None);
        assert_eq!(cache.get("key"), None);
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let cache = cache();
        cache.set("short", "a".to_string(), Duration::from_millis(20));
        cache.set("long", "b".to_string(), Duration::from_secs(60));

        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some("b".to_string()));
    }

    #[test]
    fn sweep_keeps_entries_within_retention() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.set("key", "value".to_string(), Duration::from_millis(10));

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get_stale("key"), Some("value".to_string()));
    }

    #[test]
    fn cache_clear() {
        let cache = cache();
        cache.set("a", "1".to_string(), Duration::from_secs(60));
        cache.set("b", "2".to_string(), Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_drops_unretained_entries_at_expiry() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.set("github:octocat", "raw".to_string(), Duration::from_millis(10));
        cache.set_without_retention("heatmap:merged", "merged".to_string(), Duration::from_millis(10));

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get_stale("heatmap:merged"), None);
        assert_eq!(cache.get_stale("github:octocat"), Some("raw".to_string()));
    }

    #[test]
    fn unretained_entry_is_fresh_until_expiry() {
        let cache: TtlCache<String> = TtlCache::default();
        cache.set_without_retention("heatmap:merged", "merged".to_string(), Duration::from_secs(60));

        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get("heatmap:merged"), Some("merged".to_string()));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let cache = cache();
        cache.set("key", "value".to_string(), Duration::MAX);
        assert_eq!(cache.get("key"), Some("value".to_string()));
        assert_eq!(cache.sweep(), 0);
    }

    #[test]
    fn cache_value_variants() {
        let payload = Arc::new(serde_json::json!({"data": {}}));
        let value = CacheValue::Upstream(payload.clone());
        assert_eq!(value.clone().into_upstream(), Some(payload));
        assert!(value.into_heatmap().is_none());
    }
}
