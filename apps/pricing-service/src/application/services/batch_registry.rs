//! Batch Registry
//!
//! Owns the directory of live batches and enforces the lifecycle callers
//! observe:
//!
//! ```text
//! OPEN --add_chunk*--> OPEN
//! OPEN --complete--> REMOVED (published)
//! OPEN --cancel--> REMOVED (discarded)
//! ```
//!
//! The directory is the authority for whether an id exists. It sits behind
//! its own short-held lock; each batch has its own lock inside
//! `CompactingBatch`, so work on one batch never waits on another.
//!
//! A cancelled id leaves a tombstone so that a follow-up `complete` is
//! acknowledged as a no-op. The tombstone is consumed by that call. At most
//! `tombstone_limit` tombstones are kept; past that the oldest is evicted,
//! and a `complete` for an evicted id is `BatchNotFound`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::application::ports::PriceStore;
use crate::domain::batch::{BatchId, BatchState, CompactingBatch, CompleteOutcome};
use crate::domain::pricing::{InstrumentKey, MergeFn, PriceValue, price_merge_fn};

/// Accumulator type used for price batches.
pub type PriceBatch = CompactingBatch<InstrumentKey, PriceValue>;

/// Default number of cancelled batch ids remembered for a follow-up `complete`.
pub const DEFAULT_TOMBSTONE_LIMIT: usize = 10_000;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The id was never issued or has already been resolved.
    #[error("batch {0} not found")]
    BatchNotFound(BatchId),
    /// The chunk was empty or contained a malformed entry.
    #[error("empty or malformed chunk: {0}")]
    EmptyOrMalformedChunk(String),
}

/// How a `complete` call resolved a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The batch snapshot was merged into the store.
    Published {
        /// Number of distinct instruments published.
        entries: usize,
    },
    /// The batch had been cancelled; nothing was published.
    Discarded,
}

impl Completion {
    /// Outcome name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Published { .. } => "published",
            Self::Discarded => "discarded",
        }
    }

    /// Number of instruments published (0 if discarded).
    #[must_use]
    pub const fn entries(&self) -> usize {
        match self {
            Self::Published { entries } => *entries,
            Self::Discarded => 0,
        }
    }
}

// Cancelled ids in insertion order, bounded by `limit`.
#[derive(Debug)]
struct Tombstones {
    ids: HashSet<BatchId>,
    order: VecDeque<BatchId>,
    limit: usize,
}

impl Tombstones {
    fn new(limit: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            limit,
        }
    }

    fn insert(&mut self, id: BatchId) {
        if self.limit == 0 {
            return;
        }
        while self.ids.len() >= self.limit {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.ids.remove(&oldest) {
                tracing::debug!(batch_id = %oldest, "Evicted cancelled batch tombstone");
            }
        }
        if self.ids.insert(id) {
            self.order.push_back(id);
        }
    }

    fn take(&mut self, id: BatchId) -> bool {
        if !self.ids.remove(&id) {
            return false;
        }
        if let Some(position) = self.order.iter().position(|queued| *queued == id) {
            self.order.remove(position);
        }
        true
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

enum Resolved {
    Live(Arc<PriceBatch>),
    Tombstone,
    Missing,
}

/// Process-wide directory of live price batches.
///
/// Construct one at startup and share it behind an `Arc` with whatever
/// boundary layer needs it.
pub struct BatchRegistry<S: PriceStore> {
    store: Arc<S>,
    merge: MergeFn<PriceValue>,
    next_id: AtomicU64,
    live: RwLock<HashMap<BatchId, Arc<PriceBatch>>>,
    cancelled: Mutex<Tombstones>,
}

impl<S: PriceStore> BatchRegistry<S> {
    /// Create a registry publishing into `store` with the system merge rule.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_merge_fn(store, price_merge_fn())
    }

    /// Create a registry with a custom merge rule for in-batch compaction.
    #[must_use]
    pub fn with_merge_fn(store: Arc<S>, merge: MergeFn<PriceValue>) -> Self {
        Self {
            store,
            merge,
            next_id: AtomicU64::new(1),
            live: RwLock::new(HashMap::new()),
            cancelled: Mutex::new(Tombstones::new(DEFAULT_TOMBSTONE_LIMIT)),
        }
    }

    /// Bound the number of cancelled ids remembered for a follow-up
    /// `complete`. A limit of 0 disables tombstones entirely.
    #[must_use]
    pub fn with_tombstone_limit(self, limit: usize) -> Self {
        Self {
            cancelled: Mutex::new(Tombstones::new(limit)),
            ..self
        }
    }

    /// Open a new batch and return its id.
    pub fn create_batch(&self) -> BatchId {
        let id = BatchId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        let store = Arc::clone(&self.store);
        let batch = Arc::new(PriceBatch::new(
            Arc::clone(&self.merge),
            Box::new(move |snapshot| store.merge(snapshot)),
        ));
        self.live.write().insert(id, batch);

        tracing::info!(batch_id = %id, "Batch created");
        id
    }

    /// Apply an ordered chunk of prices to an open batch.
    ///
    /// The chunk is validated as a whole before anything is applied.
    /// Returns the number of prices applied.
    ///
    /// # Errors
    ///
    /// - `RegistryError::BatchNotFound` if the id is not live
    /// - `RegistryError::EmptyOrMalformedChunk` if the chunk is empty or an
    ///   entry fails validation
    pub fn add_chunk(&self, id: BatchId, prices: Vec<PriceValue>) -> Result<usize, RegistryError> {
        let batch = self.lookup(id)?;

        if prices.is_empty() {
            tracing::warn!(batch_id = %id, "Rejecting empty chunk");
            return Err(RegistryError::EmptyOrMalformedChunk(
                "chunk contains no prices".to_string(),
            ));
        }

        for (index, price) in prices.iter().enumerate() {
            if let Err(e) = price.validate() {
                tracing::warn!(batch_id = %id, index, error = %e, "Rejecting malformed chunk");
                return Err(RegistryError::EmptyOrMalformedChunk(format!(
                    "entry {index}: {e}"
                )));
            }
        }

        let applied = batch
            .add_all(prices.into_iter().map(|price| (price.instrument.clone(), price)))
            // Only a closed batch fails here: resolved concurrently after the lookup.
            .map_err(|_| RegistryError::BatchNotFound(id))?;

        tracing::debug!(batch_id = %id, entries = applied, "Chunk accepted");
        Ok(applied)
    }

    /// Complete a batch, publishing its compacted contents to the store.
    ///
    /// The id is removed from the directory before the snapshot is
    /// published, so concurrent calls for the same id resolve it once.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::BatchNotFound` if the id is neither live nor
    /// a cancelled tombstone.
    pub fn complete(&self, id: BatchId) -> Result<Completion, RegistryError> {
        match self.resolve(id) {
            Resolved::Live(batch) => match batch.complete() {
                CompleteOutcome::Published { entries } => {
                    tracing::info!(batch_id = %id, entries, "Batch completed");
                    Ok(Completion::Published { entries })
                }
                CompleteOutcome::Ignored(state) => {
                    tracing::debug!(batch_id = %id, state = state.as_str(), "Batch already closed");
                    Ok(Completion::Discarded)
                }
            },
            Resolved::Tombstone => {
                tracing::debug!(batch_id = %id, "Complete on cancelled batch acknowledged");
                Ok(Completion::Discarded)
            }
            Resolved::Missing => Err(RegistryError::BatchNotFound(id)),
        }
    }

    /// Cancel a batch, discarding its contents.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::BatchNotFound` if the id is not live.
    pub fn cancel(&self, id: BatchId) -> Result<(), RegistryError> {
        let batch = {
            let mut live = self.live.write();
            let batch = live.remove(&id).ok_or(RegistryError::BatchNotFound(id))?;
            self.cancelled.lock().insert(id);
            batch
        };

        let entries = batch.len();
        batch.cancel();
        tracing::info!(batch_id = %id, entries, "Batch cancelled");
        Ok(())
    }

    /// State of a live batch, or `None` if the id is not live.
    #[must_use]
    pub fn batch_state(&self, id: BatchId) -> Option<BatchState> {
        self.live.read().get(&id).map(|batch| batch.state())
    }

    /// Number of live batches.
    #[must_use]
    pub fn open_batches(&self) -> usize {
        self.live.read().len()
    }

    /// Number of cancelled batches still awaiting a follow-up `complete`.
    ///
    /// Never exceeds the tombstone limit.
    #[must_use]
    pub fn cancelled_batches(&self) -> usize {
        self.cancelled.lock().len()
    }

    /// The store completed batches publish into.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn lookup(&self, id: BatchId) -> Result<Arc<PriceBatch>, RegistryError> {
        self.live
            .read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::BatchNotFound(id))
    }

    fn resolve(&self, id: BatchId) -> Resolved {
        // Directory lock is held across the tombstone check so a concurrent
        // cancel is observed either fully or not at all.
        let mut live = self.live.write();
        if let Some(batch) = live.remove(&id) {
            return Resolved::Live(batch);
        }
        if self.cancelled.lock().take(id) {
            return Resolved::Tombstone;
        }
        Resolved::Missing
    }
}

impl<S: PriceStore> fmt::Debug for BatchRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRegistry")
            .field("open_batches", &self.open_batches())
            .field("cancelled_batches", &self.cancelled_batches())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
