//! Batch Accumulation
//!
//! A batch collects keyed updates until it is either completed, at which
//! point its compacted contents are handed to a terminal consumer in one
//! call, or cancelled, at which point they are dropped.
//!
//! # Design
//!
//! `CompactingBatch` keeps the map, the lifecycle state, and the one-shot
//! consumer behind a single per-batch mutex. Distinct batches never share a
//! lock. The merge function and the consumer are injected at construction,
//! so the accumulator knows nothing about prices or stores.
//!
//! ```text
//! OPEN --add*--> OPEN
//! OPEN --complete--> COMPLETED   (consumer invoked once with the map)
//! OPEN --cancel--> CANCELLED     (map dropped)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::MergeFn;

// =============================================================================
// Types
// =============================================================================

/// Identifier of a batch. Positive and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(u64);

impl BatchId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a batch accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// Accepting updates.
    Open,
    /// Contents published to the consumer.
    Completed,
    /// Contents discarded.
    Cancelled,
}

impl BatchState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the batch has left the open state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Terminal consumer receiving the final snapshot of a completed batch.
pub type SnapshotConsumer<K, V> = Box<dyn FnOnce(HashMap<K, V>) + Send>;

/// Result of a `complete` call on an accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The snapshot was handed to the consumer.
    Published {
        /// Number of distinct keys in the snapshot.
        entries: usize,
    },
    /// The batch had already left the open state; nothing happened.
    Ignored(BatchState),
}

/// Accumulator errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// A required argument was absent.
    #[error("invalid argument: {0} must be present")]
    InvalidArgument(&'static str),
    /// The batch no longer accepts updates.
    #[error("batch is {} and no longer accepts updates", .0.as_str())]
    Closed(BatchState),
}

// =============================================================================
// Compacting Batch
// =============================================================================

struct BatchInner<K, V> {
    entries: HashMap<K, V>,
    state: BatchState,
    consumer: Option<SnapshotConsumer<K, V>>,
}

impl<K: Eq + Hash, V> BatchInner<K, V> {
    fn insert(&mut self, key: K, value: V, merge: &MergeFn<V>) {
        let winner = match self.entries.remove(&key) {
            Some(existing) => merge(existing, value),
            None => value,
        };
        self.entries.insert(key, winner);
    }
}

/// Lock-protected key/value accumulator with an injected merge rule and a
/// one-shot publish contract.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use pricing_service::domain::batch::CompactingBatch;
///
/// let published = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&published);
/// let batch = CompactingBatch::new(
///     Arc::new(|existing: u32, incoming: u32| existing.max(incoming)),
///     Box::new(move |snapshot| sink.lock().unwrap().push(snapshot)),
/// );
///
/// batch.add("a", 1).unwrap();
/// batch.add("a", 3).unwrap();
/// batch.add("a", 2).unwrap();
/// batch.complete();
///
/// let published = published.lock().unwrap();
/// assert_eq!(published.len(), 1);
/// assert_eq!(published[0]["a"], 3);
/// ```
pub struct CompactingBatch<K, V> {
    inner: Mutex<BatchInner<K, V>>,
    merge: MergeFn<V>,
}

impl<K, V> CompactingBatch<K, V>
where
    K: Eq + Hash,
{
    /// Create an open accumulator.
    #[must_use]
    pub fn new(merge: MergeFn<V>, consumer: SnapshotConsumer<K, V>) -> Self {
        Self {
            inner: Mutex::new(BatchInner {
                entries: HashMap::new(),
                state: BatchState::Open,
                consumer: Some(consumer),
            }),
            merge,
        }
    }

    /// Add a value, merging it with any value already held for the key.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Closed` if the batch has been completed or
    /// cancelled.
    pub fn add(&self, key: K, value: V) -> Result<(), BatchError> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return Err(BatchError::Closed(inner.state));
        }
        inner.insert(key, value, &self.merge);
        Ok(())
    }

    /// Add a value whose key or value may be absent.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::InvalidArgument` if either argument is `None`
    /// (the map is left untouched), or `BatchError::Closed` as for `add`.
    pub fn try_add(&self, key: Option<K>, value: Option<V>) -> Result<(), BatchError> {
        let key = key.ok_or(BatchError::InvalidArgument("key"))?;
        let value = value.ok_or(BatchError::InvalidArgument("value"))?;
        self.add(key, value)
    }

    /// Add several values under one lock acquisition, in iteration order.
    ///
    /// Either all values are applied or, if the batch is closed, none are.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Closed` if the batch has been completed or
    /// cancelled.
    pub fn add_all<I>(&self, values: I) -> Result<usize, BatchError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return Err(BatchError::Closed(inner.state));
        }
        let mut applied = 0;
        for (key, value) in values {
            inner.insert(key, value, &self.merge);
            applied += 1;
        }
        Ok(applied)
    }

    /// Publish the accumulated map to the consumer and close the batch.
    ///
    /// Calling this on a batch that is no longer open does nothing.
    pub fn complete(&self) -> CompleteOutcome {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            tracing::debug!(state = inner.state.as_str(), "Ignoring complete on closed batch");
            return CompleteOutcome::Ignored(inner.state);
        }

        inner.state = BatchState::Completed;
        let snapshot = std::mem::take(&mut inner.entries);
        let entries = snapshot.len();

        // Consumer runs under the batch lock so no add can slip in between.
        if let Some(consumer) = inner.consumer.take() {
            consumer(snapshot);
        }

        CompleteOutcome::Published { entries }
    }

    /// Discard the accumulated map and close the batch.
    ///
    /// Returns `true` if the batch was open.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        inner.state = BatchState::Cancelled;
        inner.entries = HashMap::new();
        inner.consumer = None;
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BatchState {
        self.inner.lock().state
    }

    /// Number of distinct keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no keys are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl<K, V> fmt::Debug for CompactingBatch<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CompactingBatch")
            .field("state", &inner.state)
            .field("entries", &inner.entries.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
