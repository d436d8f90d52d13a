//! Time-bounded memoization of per-provider observations.
//!
//! Keyed by `(provider, quantized coordinate)`. Expired entries are treated
//! as absent and dropped on read — no background sweep. The map is
//! unbounded; key cardinality here is providers × monitored plots, which
//! stays small.

use common::{GeoLocation, WeatherObservation};
use dashmap::DashMap;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider: &'static str,
    lat_e4: i64,
    lon_e4: i64,
}

impl CacheKey {
    pub fn new(provider: &'static str, location: GeoLocation) -> Self {
        let (lat_e4, lon_e4) = location.grid_key();
        Self {
            provider,
            lat_e4,
            lon_e4,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: WeatherObservation,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ObservationCache {
    ttl: Duration,
    entries: DashMap<CacheKey, CacheEntry>,
}

impl ObservationCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl: Duration::from_millis(ttl_ms),
            entries: DashMap::new(),
        }
    }

    /// Live entry for `key`, or `None` for both never-set and expired
    /// (callers cannot distinguish the two). Expired entries are removed.
    pub fn get(&self, key: &CacheKey) -> Option<WeatherObservation> {
        {
            let entry = self.entries.get(key)?;
            if Instant::now() < entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    /// Store `value`, unconditionally replacing any existing entry.
    pub fn set(&self, key: CacheKey, value: WeatherObservation) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
