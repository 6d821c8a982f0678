use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use telemon_common::window;

/// Cached top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Dashboard,
    Realtime,
}

/// `(view, window seconds)`.
pub type ViewKey = (ViewKind, i64);

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// 0.0 to 1.0.
    pub hit_rate: f64,
    pub ttl_secs: i64,
}

/// Fixed-TTL view cache with hit/miss accounting.
pub struct ViewCache<V> {
    entries: DashMap<ViewKey, Entry<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ViewCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &ViewKey) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Live entry for `key`. An expired entry counts as a miss and is
    /// dropped.
    pub fn get_at(&self, key: &ViewKey, now: DateTime<Utc>) -> Option<V> {
        let live = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));
        match live {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: ViewKey, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    pub fn insert_at(&self, key: ViewKey, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: window::expires_at(now, self.ttl),
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Drop every entry. Hit and miss counters are kept.
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries: self.entries.len(),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            ttl_secs: self.ttl.num_seconds(),
        }
    }
}
