//! Expiring in-memory cache for market metadata.
//!
//! A plain time-expiring key-value map keyed by the market identity
//! (condition id, else slug). Expiry is the only invalidation trigger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Market;

/// Cache behavior for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read a non-expired entry if present; otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the cached entry.
    Refresh,
    /// Always fetch; neither read nor write the cache.
    Bypass,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    market: Market,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CacheInner {
    fn get(&self, key: &str) -> Option<Market> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.market.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: String, market: Market) {
        let expires_at = Instant::now() + self.ttl;
        self.map.insert(key, CacheEntry { market, expires_at });
    }
}

/// Thread-safe market metadata cache.
#[derive(Debug, Clone)]
pub struct MarketCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl MarketCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Default TTL of 5 minutes.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn get(&self, key: &str) -> Option<Market> {
        self.inner.read().await.get(key)
    }

    /// Store under both identity keys so lookups by either slug or
    /// condition id hit.
    pub async fn put(&self, market: &Market) {
        let mut store = self.inner.write().await;
        if store.ttl == Duration::ZERO {
            return;
        }
        if let Some(condition_id) = &market.condition_id {
            store.put(condition_id.clone(), market.clone());
        }
        if !market.slug.is_empty() {
            store.put(market.slug.clone(), market.clone());
        }
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }
}
