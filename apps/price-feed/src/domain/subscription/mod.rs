//! Callback Registry
//!
//! Tracks which callbacks are interested in which trading pairs and
//! dispatches inbound price updates to them.
//!
//! # Design
//!
//! The registry is client-local state, deliberately decoupled from the
//! server-side subscription set: registering a callback does not send
//! a subscribe frame, and deregistering the last callback for a pair
//! does not send an unsubscribe frame. Callers own that coordination.
//!
//! Set semantics per pair are enforced by callback identity
//! (`Arc` pointer equality): registering the same handle twice has no
//! additional effect, and a single inbound update invokes each
//! registered handle exactly once.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::streaming::PriceData;

/// A trading pair identifier, e.g. `"BTC/USD"`. Opaque to this layer.
pub type Pair = String;

/// Callback invoked for each inbound price update on a pair.
///
/// Handles are compared by pointer identity, so the same `Arc` must be
/// used for deregistration.
pub type PriceCallback = Arc<dyn Fn(&PriceData) + Send + Sync>;

/// Thread-safe registry mapping pairs to sets of callbacks.
#[derive(Default)]
pub struct CallbackRegistry {
    inner: RwLock<HashMap<Pair, Vec<PriceCallback>>>,
}

impl CallbackRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a pair.
    ///
    /// Returns `false` if this exact handle was already registered for
    /// the pair (set semantics).
    pub fn register(&self, pair: &str, callback: PriceCallback) -> bool {
        let mut inner = self.inner.write();
        let callbacks = inner.entry(pair.to_string()).or_default();

        if callbacks.iter().any(|c| Arc::ptr_eq(c, &callback)) {
            return false;
        }

        callbacks.push(callback);
        true
    }

    /// Deregister a callback for a pair.
    ///
    /// Removes the registry entry entirely when the last callback for
    /// the pair is removed. Returns `false` if the handle was not
    /// registered.
    pub fn deregister(&self, pair: &str, callback: &PriceCallback) -> bool {
        let mut inner = self.inner.write();
        let Some(callbacks) = inner.get_mut(pair) else {
            return false;
        };

        let before = callbacks.len();
        callbacks.retain(|c| !Arc::ptr_eq(c, callback));
        let removed = callbacks.len() < before;

        if callbacks.is_empty() {
            inner.remove(pair);
        }

        removed
    }

    /// Drop every callback registered for the listed pairs.
    ///
    /// Hard reset, not a decrement: all handles go regardless of how
    /// many were registered.
    pub fn clear_pairs(&self, pairs: &[Pair]) {
        let mut inner = self.inner.write();
        for pair in pairs {
            inner.remove(pair);
        }
    }

    /// Drop every callback for every pair.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Dispatch a price update to every callback registered for `pair`.
    ///
    /// A panicking callback is caught and logged; remaining callbacks
    /// still run. Returns the number of callbacks invoked.
    pub fn dispatch(&self, pair: &str, data: &PriceData) -> usize {
        // Snapshot under the read lock so user code runs unlocked.
        let callbacks: Vec<PriceCallback> = self
            .inner
            .read()
            .get(pair)
            .cloned()
            .unwrap_or_default();

        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(data))).is_err() {
                tracing::error!(pair, "price callback panicked; continuing dispatch");
            }
        }

        callbacks.len()
    }

    /// Number of callbacks registered for a pair.
    #[must_use]
    pub fn callback_count(&self, pair: &str) -> usize {
        self.inner.read().get(pair).map_or(0, Vec::len)
    }

    /// Number of pairs with at least one registered callback.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.inner.read().len()
    }

    /// True when no callbacks are registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CallbackRegistry")
            .field("pairs", &inner.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn update(price: f64) -> PriceData {
        PriceData {
            price,
            timestamp: chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        }
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> PriceCallback {
        Arc::new(move |_data| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn register_and_dispatch() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let cb: PriceCallback = Arc::new(move |data| {
            seen_clone.lock().unwrap().push(data.price);
        });

        assert!(registry.register("BTC/USD", cb));
        let invoked = registry.dispatch("BTC/USD", &update(42500.12));

        assert_eq!(invoked, 1);
        assert_eq!(*seen.lock().unwrap(), vec![42500.12]);
    }

    #[test]
    fn duplicate_handle_registers_once() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let cb = counting_callback(Arc::clone(&counter));

        assert!(registry.register("BTC/USD", Arc::clone(&cb)));
        assert!(!registry.register("BTC/USD", Arc::clone(&cb)));

        registry.dispatch("BTC/USD", &update(1.0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_handles_both_invoked() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register("ETH/USD", counting_callback(Arc::clone(&counter)));
        registry.register("ETH/USD", counting_callback(Arc::clone(&counter)));

        let invoked = registry.dispatch("ETH/USD", &update(2.0));
        assert_eq!(invoked, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn deregister_last_callback_drops_entry() {
        let registry = CallbackRegistry::new();
        let cb = counting_callback(Arc::new(AtomicUsize::new(0)));

        registry.register("BTC/USD", Arc::clone(&cb));
        assert_eq!(registry.pair_count(), 1);

        assert!(registry.deregister("BTC/USD", &cb));
        assert_eq!(registry.pair_count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn deregister_unknown_handle_is_noop() {
        let registry = CallbackRegistry::new();
        let registered = counting_callback(Arc::new(AtomicUsize::new(0)));
        let other = counting_callback(Arc::new(AtomicUsize::new(0)));

        registry.register("BTC/USD", Arc::clone(&registered));

        assert!(!registry.deregister("BTC/USD", &other));
        assert!(!registry.deregister("ETH/USD", &registered));
        assert_eq!(registry.callback_count("BTC/USD"), 1);
    }

    #[test]
    fn clear_pairs_is_a_hard_reset() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register("BTC/USD", counting_callback(Arc::clone(&counter)));
        registry.register("BTC/USD", counting_callback(Arc::clone(&counter)));
        registry.register("ETH/USD", counting_callback(Arc::clone(&counter)));

        registry.clear_pairs(&["BTC/USD".to_string()]);

        assert_eq!(registry.callback_count("BTC/USD"), 0);
        assert_eq!(registry.dispatch("BTC/USD", &update(1.0)), 0);
        assert_eq!(registry.callback_count("ETH/USD"), 1);
    }

    #[test]
    fn panicking_callback_does_not_stop_dispatch() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let panicking: PriceCallback = Arc::new(|_data| {
            panic!("subscriber bug");
        });
        registry.register("BTC/USD", panicking);
        registry.register("BTC/USD", counting_callback(Arc::clone(&counter)));

        let invoked = registry.dispatch("BTC/USD", &update(3.0));

        assert_eq!(invoked, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_unknown_pair_invokes_nothing() {
        let registry = CallbackRegistry::new();
        assert_eq!(registry.dispatch("DOGE/USD", &update(0.1)), 0);
    }
}
