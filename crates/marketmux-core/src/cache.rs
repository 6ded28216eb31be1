//! Short-TTL memo of resolved answers.
//!
//! Only successful resolutions are written; losing race branches never touch
//! the map. Staleness is detected on read (an expired entry is a miss) and
//! the next successful resolution overwrites it. There is no sweeper; a
//! discarded entry only costs one re-resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::{CandleSeries, DayStats, Direction, Endpoint, Interval, Mover};

/// Cache key: one resolved answer per (operation, instrument token, interval).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    op: Endpoint,
    token: String,
    interval: Option<Interval>,
}

impl CacheKey {
    pub fn price(asset_class: crate::AssetClass, symbol: &crate::Symbol) -> Self {
        Self {
            op: Endpoint::Spot,
            token: format!("{asset_class}:{symbol}"),
            interval: None,
        }
    }

    pub fn candles(
        asset_class: crate::AssetClass,
        symbol: &crate::Symbol,
        interval: Interval,
    ) -> Self {
        Self {
            op: Endpoint::Candles,
            token: format!("{asset_class}:{symbol}"),
            interval: Some(interval),
        }
    }

    pub fn stats(symbol: &crate::Symbol) -> Self {
        Self {
            op: Endpoint::Stats,
            token: symbol.to_string(),
            interval: None,
        }
    }

    pub fn movers(asset_class: crate::AssetClass, direction: Direction, limit: usize) -> Self {
        Self {
            op: Endpoint::Snapshot,
            token: format!("{asset_class}:{direction}:{limit}"),
            interval: None,
        }
    }
}

/// Resolved answers stored by the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedAnswer {
    Price(f64),
    Candles(CandleSeries),
    Stats(DayStats),
    Movers(Vec<Mover>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedAnswer,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

/// Thread-safe TTL cache of resolved answers. A zero TTL disables it.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// 60 second TTL, the engine default.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(60))
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedAnswer> {
        let store = self.inner.read().await;
        store.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub async fn put(&self, key: CacheKey, value: CachedAnswer) {
        let mut store = self.inner.write().await;
        if store.ttl.is_zero() {
            return;
        }

        let expires_at = Instant::now() + store.ttl;
        store.map.insert(key, CacheEntry { value, expires_at });
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }
}
