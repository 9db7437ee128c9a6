//! Batch Lifecycle Integration Tests
//!
//! Drives the registry and the in-memory store together, the way the HTTP
//! layer does, and checks what a reader of the store observes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use pricing_service::{
    BatchId, BatchRegistry, Completion, InMemoryPriceStore, InstrumentKey, PriceLookupError,
    PriceStore, PriceValue, RegistryError,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
}

fn price(key: &str, minutes: i64, px: f64) -> PriceValue {
    PriceValue::new(key, t0() + Duration::minutes(minutes), json!({ "px": px }))
}

fn setup() -> (Arc<BatchRegistry<InMemoryPriceStore>>, Arc<InMemoryPriceStore>) {
    let store = Arc::new(InMemoryPriceStore::new());
    let registry = Arc::new(BatchRegistry::new(Arc::clone(&store)));
    (registry, store)
}

// =============================================================================
// Single Batch
// =============================================================================

#[test]
fn test_open_batch_is_invisible_to_readers() {
    let (registry, store) = setup();
    let id = registry.create_batch();

    registry.add_chunk(id, vec![price("ref1", 1, 100.0)]).unwrap();

    assert!(matches!(
        store.get_latest(&"ref1".into()),
        Err(PriceLookupError::NotFound(_))
    ));
}

#[test]
fn test_chunks_then_complete_publishes_prices() {
    let (registry, store) = setup();
    let id = registry.create_batch();
    assert!(id.get() > 0);

    registry.add_chunk(id, vec![price("ref1", 1, 100.0)]).unwrap();
    registry.add_chunk(id, vec![price("ref2", 2, 200.0)]).unwrap();
    let completion = registry.complete(id).unwrap();

    assert_eq!(completion, Completion::Published { entries: 2 });
    assert_eq!(store.get_latest(&"ref1".into()).unwrap(), price("ref1", 1, 100.0));
    assert_eq!(store.get_latest(&"ref2".into()).unwrap(), price("ref2", 2, 200.0));
}

#[test]
fn test_overlapping_chunks_compact_to_latest() {
    let (registry, store) = setup();
    let id = registry.create_batch();

    registry
        .add_chunk(id, vec![price("ref1", 1, 1.0), price("ref2", 5, 2.0)])
        .unwrap();
    registry
        .add_chunk(id, vec![price("ref2", 3, 3.0), price("ref3", 1, 4.0)])
        .unwrap();
    registry.complete(id).unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(store.get_latest(&"ref2".into()).unwrap(), price("ref2", 5, 2.0));
}

#[test]
fn test_cancelled_batch_never_publishes() {
    let (registry, store) = setup();
    let id = registry.create_batch();
    registry.add_chunk(id, vec![price("ref3", 1, 1.0)]).unwrap();

    registry.cancel(id).unwrap();
    let completion = registry.complete(id).unwrap();

    assert_eq!(completion, Completion::Discarded);
    assert!(store.get_latest(&"ref3".into()).is_err());
    assert!(store.is_empty());
}

#[test]
fn test_never_issued_id_is_not_found() {
    let (registry, _store) = setup();
    let id = BatchId::new(333);

    assert_eq!(registry.complete(id), Err(RegistryError::BatchNotFound(id)));
    assert_eq!(registry.cancel(id), Err(RegistryError::BatchNotFound(id)));
}

#[test]
fn test_empty_and_malformed_chunks_are_rejected() {
    let (registry, _store) = setup();
    let id = registry.create_batch();

    assert!(matches!(
        registry.add_chunk(id, vec![]),
        Err(RegistryError::EmptyOrMalformedChunk(_))
    ));
    assert!(matches!(
        registry.add_chunk(id, vec![PriceValue::new("", t0(), json!({}))]),
        Err(RegistryError::EmptyOrMalformedChunk(_))
    ));

    // The batch is still open and usable.
    registry.add_chunk(id, vec![price("ref1", 0, 1.0)]).unwrap();
    assert_eq!(registry.complete(id).unwrap().entries(), 1);
}

// =============================================================================
// Across Batches
// =============================================================================

#[test]
fn test_later_batch_with_older_price_does_not_regress() {
    let (registry, store) = setup();

    let first = registry.create_batch();
    registry.add_chunk(first, vec![price("ref1", 10, 1.0)]).unwrap();
    registry.complete(first).unwrap();

    let second = registry.create_batch();
    registry.add_chunk(second, vec![price("ref1", 5, 2.0)]).unwrap();
    registry.complete(second).unwrap();

    assert_eq!(store.get_latest(&"ref1".into()).unwrap(), price("ref1", 10, 1.0));
}

#[test]
fn test_equal_timestamps_keep_first_completed() {
    let (registry, store) = setup();

    let first = registry.create_batch();
    let second = registry.create_batch();
    registry.add_chunk(first, vec![price("ref1", 1, 1.0)]).unwrap();
    registry.add_chunk(second, vec![price("ref1", 1, 2.0)]).unwrap();

    registry.complete(second).unwrap();
    registry.complete(first).unwrap();

    assert_eq!(store.get_latest(&"ref1".into()).unwrap(), price("ref1", 1, 2.0));
}

#[test]
fn test_interleaved_batches_are_independent() {
    let (registry, store) = setup();

    let kept = registry.create_batch();
    let dropped = registry.create_batch();
    registry.add_chunk(kept, vec![price("ref1", 1, 1.0)]).unwrap();
    registry.add_chunk(dropped, vec![price("ref1", 9, 9.0)]).unwrap();
    registry.add_chunk(dropped, vec![price("ref2", 9, 9.0)]).unwrap();

    registry.cancel(dropped).unwrap();
    registry.complete(kept).unwrap();

    assert_eq!(store.get_latest(&"ref1".into()).unwrap(), price("ref1", 1, 1.0));
    assert!(store.get_latest(&InstrumentKey::from("ref2")).is_err());
}

#[test]
fn test_concurrent_completions_converge_on_latest_timestamp() {
    let (registry, store) = setup();

    let handles: Vec<_> = (0..32i64)
        .map(|n| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let id = registry.create_batch();
                let chunk = vec![
                    price("shared", n, n as f64),
                    price(&format!("own{n}"), 0, 0.0),
                ];
                registry.add_chunk(id, chunk).unwrap();
                registry.complete(id).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.open_batches(), 0);
    assert_eq!(store.len(), 33);
    assert_eq!(store.get_latest(&"shared".into()).unwrap(), price("shared", 31, 31.0));
}

#[test]
fn test_cancel_and_walk_away_keeps_tombstones_bounded() {
    let store = Arc::new(InMemoryPriceStore::new());
    let registry = BatchRegistry::new(Arc::clone(&store)).with_tombstone_limit(64);

    let mut last = None;
    for n in 0..10_000 {
        let id = registry.create_batch();
        registry.add_chunk(id, vec![price("ref1", n, 1.0)]).unwrap();
        registry.cancel(id).unwrap();
        last = Some(id);
    }

    assert_eq!(registry.open_batches(), 0);
    assert_eq!(registry.cancelled_batches(), 64);
    let evicted = BatchId::new(1);
    assert_eq!(registry.complete(evicted), Err(RegistryError::BatchNotFound(evicted)));
    assert_eq!(registry.complete(last.unwrap()), Ok(Completion::Discarded));
    assert!(store.is_empty());
}

#[test]
fn test_chunks_racing_completion_are_all_or_nothing() {
    let (registry, store) = setup();
    let id = registry.create_batch();

    let writers: Vec<_> = (0..4i64)
        .map(|n| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let mut accepted = 0;
                for minute in 0..200 {
                    let chunk = vec![
                        price(&format!("w{n}-a"), minute, 0.0),
                        price(&format!("w{n}-b"), minute, 0.0),
                    ];
                    match registry.add_chunk(id, chunk) {
                        Ok(_) => accepted += 1,
                        Err(RegistryError::BatchNotFound(_)) => break,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                accepted
            })
        })
        .collect();

    std::thread::sleep(std::time::Duration::from_millis(1));
    registry.complete(id).unwrap();
    for writer in writers {
        writer.join().unwrap();
    }

    // Both halves of every chunk landed together, or neither did.
    for n in 0..4 {
        let a = store.get_latest(&format!("w{n}-a").into()).ok();
        let b = store.get_latest(&format!("w{n}-b").into()).ok();
        assert_eq!(a.map(|p| p.as_of), b.map(|p| p.as_of));
    }
}
