//! In-memory latest-value price store.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::application::ports::{PriceLookupError, PriceSnapshot, PriceStore};
use crate::domain::pricing::{InstrumentKey, MergeFn, PriceValue, price_merge_fn};

/// In-memory implementation of `PriceStore`.
///
/// Holds the winning value per instrument across all completed batches,
/// resolved with the same rule batches use internally.
pub struct InMemoryPriceStore {
    prices: RwLock<HashMap<InstrumentKey, PriceValue>>,
    merge: MergeFn<PriceValue>,
}

impl Default for InMemoryPriceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPriceStore {
    /// Create an empty store using the system merge rule.
    #[must_use]
    pub fn new() -> Self {
        Self::with_merge_fn(price_merge_fn())
    }

    /// Create an empty store with a custom merge rule.
    #[must_use]
    pub fn with_merge_fn(merge: MergeFn<PriceValue>) -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            merge,
        }
    }
}

impl PriceStore for InMemoryPriceStore {
    fn merge(&self, snapshot: PriceSnapshot) {
        let received = snapshot.len();
        let mut prices = self.prices.write();
        for (key, incoming) in snapshot {
            let winner = match prices.remove(&key) {
                Some(existing) => (self.merge)(existing, incoming),
                None => incoming,
            };
            prices.insert(key, winner);
        }
        tracing::debug!(received, instruments = prices.len(), "Snapshot merged into price store");
    }

    fn get_latest(&self, key: &InstrumentKey) -> Result<PriceValue, PriceLookupError> {
        self.prices
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PriceLookupError::NotFound(key.clone()))
    }

    fn len(&self) -> usize {
        self.prices.read().len()
    }
}

impl fmt::Debug for InMemoryPriceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPriceStore")
            .field("instruments", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn price(key: &str, minutes: i64, tag: &str) -> PriceValue {
        PriceValue::new(key, t0() + Duration::minutes(minutes), json!({ "tag": tag }))
    }

    fn snapshot(prices: Vec<PriceValue>) -> PriceSnapshot {
        prices
            .into_iter()
            .map(|p| (p.instrument.clone(), p))
            .collect()
    }

    #[test]
    fn unknown_instrument_is_not_found() {
        let store = InMemoryPriceStore::new();
        let key = InstrumentKey::from("777");

        assert_eq!(store.get_latest(&key), Err(PriceLookupError::NotFound(key)));
        assert!(store.is_empty());
    }

    #[test]
    fn merge_inserts_unseen_keys() {
        let store = InMemoryPriceStore::new();

        store.merge(snapshot(vec![price("AAPL", 1, "a"), price("MSFT", 1, "m")]));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_latest(&"AAPL".into()).unwrap(), price("AAPL", 1, "a"));
    }

    #[test]
    fn later_batch_value_replaces_earlier() {
        let store = InMemoryPriceStore::new();

        store.merge(snapshot(vec![price("AAPL", 1, "old")]));
        store.merge(snapshot(vec![price("AAPL", 2, "new")]));

        assert_eq!(store.get_latest(&"AAPL".into()).unwrap(), price("AAPL", 2, "new"));
    }

    #[test]
    fn stale_batch_value_is_ignored() {
        let store = InMemoryPriceStore::new();

        store.merge(snapshot(vec![price("AAPL", 5, "new")]));
        store.merge(snapshot(vec![price("AAPL", 2, "old")]));

        assert_eq!(store.get_latest(&"AAPL".into()).unwrap(), price("AAPL", 5, "new"));
    }

    #[test]
    fn equal_timestamp_keeps_stored_value() {
        let store = InMemoryPriceStore::new();

        store.merge(snapshot(vec![price("AAPL", 3, "first")]));
        store.merge(snapshot(vec![price("AAPL", 3, "second")]));

        assert_eq!(store.get_latest(&"AAPL".into()).unwrap(), price("AAPL", 3, "first"));
    }

    #[test]
    fn concurrent_merges_converge_on_latest() {
        let store = std::sync::Arc::new(InMemoryPriceStore::new());

        let handles: Vec<_> = (0..10i64)
            .map(|n| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store.merge(snapshot(vec![price("AAPL", n, &n.to_string())]));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_latest(&"AAPL".into()).unwrap(), price("AAPL", 9, "9"));
    }
}
