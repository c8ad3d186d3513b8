//! In-memory cache for directory responses.
//!
//! Entries are keyed by the query center (quantized to 4 decimal places,
//! roughly 11 m) and radius. An entry is fresh for the configured TTL and is
//! then kept as a stale fallback for when the directory is unavailable, so
//! nothing is ever evicted. The key space is bounded only by the distinct
//! queries seen during the process lifetime.
//!
//! Writes to a key replace the whole entry (last writer wins); readers never
//! observe a partially written entry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;

use crate::domain::{Coordinate, Station};

/// Default freshness window: 10 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Source of the current time, injected so TTL behaviour is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let Ok(by) = chrono::Duration::from_std(by) else {
            return;
        };
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cache key: quantized center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_e4: i64,
    lon_e4: i64,
    radius_e2: i64,
}

impl CacheKey {
    pub fn new(center: Coordinate, radius_km: f64) -> Self {
        Self {
            lat_e4: (center.latitude() * 1e4).round() as i64,
            lon_e4: (center.longitude() * 1e4).round() as i64,
            radius_e2: (radius_km * 1e2).round() as i64,
        }
    }
}

/// A cached station list.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stations: Arc<Vec<Station>>,
    pub created_at: DateTime<Utc>,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: CacheEntry,
    pub is_fresh: bool,
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry counts as fresh.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

/// Station list cache.
pub struct StationCache {
    entries: MokaCache<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl StationCache {
    /// Create a cache on the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        // No capacity bound and no TTL: stale entries stay as fallbacks.
        let entries = MokaCache::builder().build();

        Self {
            entries,
            ttl: config.ttl,
            clock,
        }
    }

    /// Look up an entry, fresh or stale.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheLookup> {
        let entry = self.entries.get(key).await?;
        let is_fresh = self.is_fresh(&entry);
        Some(CacheLookup { entry, is_fresh })
    }

    /// Store a station list, replacing any previous entry for the key.
    pub async fn put(&self, key: CacheKey, stations: Vec<Station>) -> CacheEntry {
        let entry = CacheEntry {
            stations: Arc::new(stations),
            created_at: self.clock.now(),
        };
        self.entries.insert(key, entry.clone()).await;
        entry
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match (self.clock.now() - entry.created_at).to_std() {
            Ok(age) => age < self.ttl,
            // Entry from the future (clock stepped back): still fresh.
            Err(_) => true,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}
