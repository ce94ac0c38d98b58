//! Price cache integration tests.
//!
//! Concurrency-focused coverage: the in-flight coalescing and its
//! interaction with `clear` need fetchers the test can hold open, so
//! these use hand-built fakes instead of mocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use price_feed::{FetchError, PriceCache, PriceFetcher};
use tokio::sync::Semaphore;

/// Fetcher that blocks until the test releases it.
struct GatedFetcher {
    calls: AtomicUsize,
    gate: Semaphore,
    result: Result<Option<f64>, FetchError>,
}

impl GatedFetcher {
    fn new(result: Result<Option<f64>, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            result,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl PriceFetcher for GatedFetcher {
    async fn fetch_price(&self, _pair: &str) -> Result<Option<f64>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.map_err(|_| {
            FetchError::Transport("gate closed".to_string())
        })?;
        self.result.clone()
    }
}

/// Fetcher that answers immediately and counts calls.
struct CountingFetcher {
    calls: AtomicUsize,
    price: Option<f64>,
}

impl CountingFetcher {
    fn new(price: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            price,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFetcher for CountingFetcher {
    async fn fetch_price(&self, _pair: &str) -> Result<Option<f64>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.price)
    }
}

/// Let spawned lookups reach the fetcher.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn concurrent_lookups_coalesce_into_one_fetch() {
    let fetcher = GatedFetcher::new(Ok(Some(42500.12)));
    let cache = Arc::new(PriceCache::with_default_ttl(
        Arc::clone(&fetcher) as Arc<dyn PriceFetcher>
    ));

    let mut lookups = Vec::new();
    for _ in 0..3 {
        let cache = Arc::clone(&cache);
        lookups.push(tokio::spawn(
            async move { cache.get("BTC/USD").await },
        ));
    }
    settle().await;

    // All three callers share the single pending request.
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.in_flight_count(), 1);

    fetcher.release(1);
    for lookup in lookups {
        assert_eq!(lookup.await.unwrap(), Some(42500.12));
    }

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(cache.in_flight_count(), 0);
}

#[tokio::test]
async fn coalesced_callers_all_observe_the_failure() {
    let fetcher = GatedFetcher::new(Err(FetchError::Status(502)));
    let cache = Arc::new(PriceCache::with_default_ttl(
        Arc::clone(&fetcher) as Arc<dyn PriceFetcher>
    ));

    let first = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("ETH/USD").await })
    };
    let second = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("ETH/USD").await })
    };
    settle().await;

    fetcher.release(1);
    assert_eq!(first.await.unwrap(), None);
    assert_eq!(second.await.unwrap(), None);

    // The failure was cached; no retry within the TTL window.
    assert_eq!(cache.get("ETH/USD").await, None);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn clear_does_not_cancel_the_in_flight_request() {
    let fetcher = GatedFetcher::new(Ok(Some(145.3)));
    let cache = Arc::new(PriceCache::with_default_ttl(
        Arc::clone(&fetcher) as Arc<dyn PriceFetcher>
    ));

    let pending = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("SOL/USD").await })
    };
    settle().await;
    assert_eq!(cache.in_flight_count(), 1);

    cache.clear();
    assert_eq!(cache.in_flight_count(), 1);

    fetcher.release(1);
    assert_eq!(pending.await.unwrap(), Some(145.3));

    // The completed request repopulated the cache after the clear.
    assert_eq!(cache.get("SOL/USD").await, Some(145.3));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn late_caller_joins_the_existing_in_flight_request() {
    let fetcher = GatedFetcher::new(Ok(Some(2500.5)));
    let cache = Arc::new(PriceCache::with_default_ttl(
        Arc::clone(&fetcher) as Arc<dyn PriceFetcher>
    ));

    let early = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("ETH/USD").await })
    };
    settle().await;

    let late = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("ETH/USD").await })
    };
    settle().await;
    assert_eq!(fetcher.calls(), 1);

    fetcher.release(1);
    assert_eq!(early.await.unwrap(), Some(2500.5));
    assert_eq!(late.await.unwrap(), Some(2500.5));
}

#[tokio::test]
async fn caches_are_instances_not_globals() {
    let fetcher = CountingFetcher::new(Some(7.0));

    let one = PriceCache::with_default_ttl(Arc::clone(&fetcher) as Arc<dyn PriceFetcher>);
    let two = PriceCache::with_default_ttl(Arc::clone(&fetcher) as Arc<dyn PriceFetcher>);

    assert_eq!(one.get("BTC/USD").await, Some(7.0));
    assert_eq!(two.get("BTC/USD").await, Some(7.0));

    // No sharing between instances.
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn clear_on_one_cache_leaves_another_untouched() {
    let fetcher = CountingFetcher::new(Some(9.0));

    let one = PriceCache::with_default_ttl(Arc::clone(&fetcher) as Arc<dyn PriceFetcher>);
    let two = PriceCache::with_default_ttl(Arc::clone(&fetcher) as Arc<dyn PriceFetcher>);

    assert_eq!(one.get("BTC/USD").await, Some(9.0));
    assert_eq!(two.get("BTC/USD").await, Some(9.0));

    one.clear();
    assert_eq!(one.get("BTC/USD").await, Some(9.0));
    assert_eq!(fetcher.calls(), 3);

    // The other instance still serves its own cached entry.
    assert_eq!(two.get("BTC/USD").await, Some(9.0));
    assert_eq!(fetcher.calls(), 3);
}
