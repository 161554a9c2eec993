//! TTL-bounded in-memory store for upstream payloads
//!
//! Provides a `CacheStore` holding one entry per key. Freshness is decided at
//! read time, so expired entries stay readable through `get_stale` to support
//! graceful degradation when the upstream API is unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::resource::CacheKey;

/// A stored payload and the time it was written
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The cache key this entry was written under
    pub key: CacheKey,
    /// The opaque upstream payload
    pub payload: Arc<Value>,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry at `now`; clock steps backwards count as zero age
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is still within `ttl` at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }
}

/// Keyed store of payloads for a single resource class
///
/// Reads and writes take a short lock and never await, so the store is never
/// locked across an upstream call. There is no eviction: the key space is the
/// bounded set of countries, cities, districts and dates.
#[derive(Debug)]
pub struct CacheStore {
    /// How long an entry is served without going upstream
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl CacheStore {
    /// Creates an empty store with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the entry only if it is younger than the TTL
    pub fn get_fresh(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Utc::now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_fresh_at(now, self.ttl))
            .cloned()
    }

    /// Returns the entry regardless of age
    ///
    /// Only used on the fallback path after an upstream failure.
    pub fn get_stale(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Writes the payload, fully replacing any previous entry for `key`
    pub fn put(&self, key: CacheKey, payload: Arc<Value>) {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: Utc::now(),
        };
        self.entries.write().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn payload(value: Value) -> Arc<Value> {
        Arc::new(value)
    }

    #[test]
    fn test_get_fresh_returns_none_for_missing_key() {
        let store = CacheStore::new(DAY);

        assert!(store.get_fresh(&CacheKey::from("city=500")).is_none());
        assert!(store.get_stale(&CacheKey::from("city=500")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_fresh_within_ttl_returns_written_payload() {
        let store = CacheStore::new(DAY);
        let key = CacheKey::from("country=2,date=2024-01-01");
        let data = json!([{ "fajr": "06:41", "isha": "19:02" }]);

        store.put(key.clone(), payload(data.clone()));

        let entry = store.get_fresh(&key).expect("Entry should be fresh");
        assert_eq!(*entry.payload, data);
        assert_eq!(entry.key, key);
    }

    #[test]
    fn test_expired_entry_is_only_available_stale() {
        // Zero TTL - every entry is expired as soon as it is written
        let store = CacheStore::new(Duration::ZERO);
        let key = CacheKey::from("city=500");
        let data = json!({ "name": "Istanbul" });

        store.put(key.clone(), payload(data.clone()));

        assert!(store.get_fresh(&key).is_none(), "Zero TTL should be expired");
        let stale = store.get_stale(&key).expect("Stale read should ignore TTL");
        assert_eq!(*stale.payload, data);
    }

    #[test]
    fn test_put_replaces_previous_entry() {
        let store = CacheStore::new(DAY);
        let key = CacheKey::from("district=9541");

        store.put(key.clone(), payload(json!({ "version": 1 })));
        store.put(key.clone(), payload(json!({ "version": 2 })));

        let entry = store.get_fresh(&key).expect("Entry should exist");
        assert_eq!(*entry.payload, json!({ "version": 2 }));
        assert_eq!(store.len(), 1, "A key holds at most one entry");
    }

    #[test]
    fn test_stored_at_timestamp_is_recorded() {
        let store = CacheStore::new(DAY);
        let key = CacheKey::from("all");

        let before = Utc::now();
        store.put(key.clone(), payload(json!([])));
        let after = Utc::now();

        let entry = store.get_stale(&key).expect("Entry should exist");
        assert!(entry.stored_at >= before);
        assert!(entry.stored_at <= after);
    }

    #[test]
    fn test_freshness_boundary() {
        let stored_at = Utc::now();
        let entry = CacheEntry {
            key: CacheKey::from("all"),
            payload: payload(json!(null)),
            stored_at,
        };
        let ttl = Duration::from_secs(60);

        assert!(entry.is_fresh_at(stored_at + ChronoDuration::seconds(59), ttl));
        assert!(!entry.is_fresh_at(stored_at + ChronoDuration::seconds(60), ttl));
        // A clock that stepped backwards never makes an entry stale
        assert!(entry.is_fresh_at(stored_at - ChronoDuration::seconds(5), ttl));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = CacheStore::new(DAY);
        store.put(CacheKey::from("city=1"), payload(json!(1)));
        store.put(CacheKey::from("city=2"), payload(json!(2)));

        assert_eq!(*store.get_fresh(&CacheKey::from("city=1")).unwrap().payload, json!(1));
        assert_eq!(*store.get_fresh(&CacheKey::from("city=2")).unwrap().payload, json!(2));
    }
}
