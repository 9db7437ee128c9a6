//! Price Store Port (Driven Port)
//!
//! Interface for the process-wide latest-value price index.

use std::collections::HashMap;

use crate::domain::pricing::{InstrumentKey, PriceValue};

/// Compacted contents of one completed batch.
pub type PriceSnapshot = HashMap<InstrumentKey, PriceValue>;

/// Price lookup error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceLookupError {
    /// No completed batch has produced a value for the instrument.
    #[error("no price found for instrument {0}")]
    NotFound(InstrumentKey),
}

/// Latest-value store for instrument prices.
///
/// `merge` is the only write path and is what a batch invokes as its
/// terminal consumer when it completes.
pub trait PriceStore: Send + Sync + 'static {
    /// Merge a whole batch snapshot, one key at a time, using the system
    /// conflict rule.
    fn merge(&self, snapshot: PriceSnapshot);

    /// Get the current value for an instrument.
    ///
    /// # Errors
    ///
    /// Returns `PriceLookupError::NotFound` if no completed batch has ever
    /// touched the instrument.
    fn get_latest(&self, key: &InstrumentKey) -> Result<PriceValue, PriceLookupError>;

    /// Number of instruments with a value.
    fn len(&self) -> usize;

    /// Whether the store holds no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
