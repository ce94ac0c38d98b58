//! Price Request Cache
//!
//! TTL cache in front of the point-in-time REST price lookup.
//! Concurrent lookups for the same pair coalesce onto one in-flight
//! request; fetch failures cache as `None` and are not retried until
//! the entry expires, so a flapping upstream cannot be hammered.
//!
//! The cache is an injectable service, not a process-wide global:
//! callers that want sharing hold one instance behind an `Arc`, tests
//! instantiate isolated ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::PriceFetcher;

/// HTTP adapter for the price fetcher port.
pub mod fetcher;

/// How long a cached price (or cached miss) stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// A settled lookup: price and when it was fetched.
struct CacheEntry {
    price: Option<f64>,
    fetched_at: Instant,
}

/// A pending lookup every coalesced caller awaits.
type SharedFetch = Shared<BoxFuture<'static, Option<f64>>>;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, SharedFetch>,
}

/// Coalescing TTL cache over a [`PriceFetcher`].
pub struct PriceCache {
    fetcher: Arc<dyn PriceFetcher>,
    ttl: Duration,
    inner: Arc<Mutex<CacheInner>>,
}

impl PriceCache {
    /// Create a cache with a custom TTL.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PriceFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    /// Create a cache with the default 60 second TTL.
    #[must_use]
    pub fn with_default_ttl(fetcher: Arc<dyn PriceFetcher>) -> Self {
        Self::new(fetcher, DEFAULT_TTL)
    }

    /// Get a recent price for `pair`.
    ///
    /// Total over its input: resolves to the price or `None`, never an
    /// error. A fresh cache entry (including a cached miss) is
    /// returned immediately; otherwise the caller joins the in-flight
    /// request for the pair or starts one.
    pub async fn get(&self, pair: &str) -> Option<f64> {
        let fetch = {
            let mut inner = self.inner.lock();

            if let Some(entry) = inner.entries.get(pair)
                && entry.fetched_at.elapsed() < self.ttl
            {
                return entry.price;
            }

            if let Some(pending) = inner.in_flight.get(pair) {
                pending.clone()
            } else {
                let fetch = self.start_fetch(pair);
                inner.in_flight.insert(pair.to_string(), fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Empty the cache.
    ///
    /// In-flight requests are untouched; they complete normally and
    /// repopulate the cache.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of pairs with a pending lookup. Diagnostic.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    /// Build the shared future that performs one lookup and settles
    /// the bookkeeping: in-flight entry out first, cache entry in,
    /// then the value reaches every awaiting caller.
    fn start_fetch(&self, pair: &str) -> SharedFetch {
        let fetcher = Arc::clone(&self.fetcher);
        let inner = Arc::clone(&self.inner);
        let pair = pair.to_string();

        let fut: BoxFuture<'static, Option<f64>> = Box::pin(async move {
            let price = match fetcher.fetch_price(&pair).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(pair = %pair, error = %e, "price fetch failed; caching miss");
                    None
                }
            };

            let mut inner = inner.lock();
            inner.in_flight.remove(&pair);
            inner.entries.insert(
                pair,
                CacheEntry {
                    price,
                    fetched_at: Instant::now(),
                },
            );

            price
        });

        fut.shared()
    }
}

impl std::fmt::Debug for PriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PriceCache")
            .field("ttl", &self.ttl)
            .field("entries", &inner.entries.len())
            .field("in_flight", &inner.in_flight.len())
            .finish()
    }
}
