//! In-memory key-value cache where every entry carries its own time-to-live.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};
use serde::{Deserialize, Serialize};
use tracing::trace;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Lifetimes of cached upstream responses, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub timelines_ttl_secs: u64,
    /// Lifetime of a successful geocoding lookup.
    pub geocode_ttl_secs: u64,
    /// Lifetime of a failed or empty geocoding lookup.
    pub geocode_miss_ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timelines_ttl_secs: 45,
            geocode_ttl_secs: 3600,
            geocode_miss_ttl_secs: 60,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn timelines_ttl(&self) -> Duration {
        Duration::from_secs(self.timelines_ttl_secs)
    }

    pub fn geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_ttl_secs)
    }

    pub fn geocode_miss_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_miss_ttl_secs)
    }
}

#[derive(Clone)]
struct Expiring<V> {
    value: V,
    ttl: Duration,
}

struct PerEntryTtl;

impl<V> Expiry<String, Expiring<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Expiring<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Expiring<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// String-keyed cache with per-entry expiry, safe to share across requests.
pub struct TtlCache<V> {
    entries: Cache<String, Expiring<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> fmt::Debug for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.entry_count())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        match self.entries.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "cache hit");
                Some(entry.value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key, "cache miss");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub async fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries
            .insert(key.into(), Expiring { value, ttl })
            .await;
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
