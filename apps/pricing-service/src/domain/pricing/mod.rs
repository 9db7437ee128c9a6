//! Price Domain Types
//!
//! Canonical representation of a price update and the conflict rule used
//! to compact several updates for the same instrument into one.
//!
//! The same rule governs compaction inside a batch and publication into
//! the latest-value store, so a value that loses inside a batch would also
//! have lost had it been published on its own.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Instrument Key
// =============================================================================

/// Identifies a tradable instrument. Used as the compaction key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentKey(String);

impl InstrumentKey {
    /// Create a new instrument key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for InstrumentKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// =============================================================================
// Price Value
// =============================================================================

/// A single price update for an instrument.
///
/// The payload is opaque to the service; only `as_of` takes part in
/// conflict resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceValue {
    /// Instrument this price belongs to.
    pub instrument: InstrumentKey,
    /// Point in time from which the price is effective.
    pub as_of: DateTime<Utc>,
    /// Opaque price data supplied by the producer.
    pub payload: serde_json::Value,
}

impl PriceValue {
    /// Create a new price value.
    #[must_use]
    pub fn new(
        instrument: impl Into<InstrumentKey>,
        as_of: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            as_of,
            payload,
        }
    }

    /// The compaction key of this value.
    #[must_use]
    pub const fn key(&self) -> &InstrumentKey {
        &self.instrument
    }

    /// Check the structural requirements for a price entry.
    ///
    /// # Errors
    ///
    /// Returns `PriceValidationError` if the instrument key is blank or the
    /// payload is JSON null.
    pub fn validate(&self) -> Result<(), PriceValidationError> {
        if self.instrument.is_blank() {
            return Err(PriceValidationError::BlankInstrument);
        }
        if self.payload.is_null() {
            return Err(PriceValidationError::MissingPayload {
                instrument: self.instrument.clone(),
            });
        }
        Ok(())
    }
}

/// Structural problems with a price entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceValidationError {
    /// Instrument key is empty.
    #[error("instrument key must not be blank")]
    BlankInstrument,
    /// Payload is absent.
    #[error("price for instrument {instrument} has no payload")]
    MissingPayload {
        /// Instrument the entry was submitted for.
        instrument: InstrumentKey,
    },
}

// =============================================================================
// Merge Rule
// =============================================================================

/// Binary conflict rule: `(existing, incoming) -> winner`.
pub type MergeFn<V> = Arc<dyn Fn(V, V) -> V + Send + Sync>;

/// The system conflict rule for prices.
///
/// A strictly later `as_of` wins. On an exact tie the value already stored
/// is kept.
#[must_use]
pub fn latest_as_of(existing: PriceValue, incoming: PriceValue) -> PriceValue {
    if incoming.as_of > existing.as_of {
        incoming
    } else {
        existing
    }
}

/// The system conflict rule as a shareable merge function.
#[must_use]
pub fn price_merge_fn() -> MergeFn<PriceValue> {
    Arc::new(latest_as_of)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    fn price(key: &str, minutes: i64, tag: &str) -> PriceValue {
        PriceValue::new(
            key,
            base_time() + Duration::minutes(minutes),
            json!({ "tag": tag }),
        )
    }

    #[test]
    fn later_incoming_wins() {
        let winner = latest_as_of(price("AAPL", 1, "old"), price("AAPL", 2, "new"));
        assert_eq!(winner.payload, json!({ "tag": "new" }));
    }

    #[test]
    fn earlier_incoming_loses() {
        let winner = latest_as_of(price("AAPL", 2, "new"), price("AAPL", 1, "old"));
        assert_eq!(winner.payload, json!({ "tag": "new" }));
    }

    #[test]
    fn tie_keeps_existing() {
        let winner = latest_as_of(price("AAPL", 1, "first"), price("AAPL", 1, "second"));
        assert_eq!(winner.payload, json!({ "tag": "first" }));
    }

    #[test]
    fn merge_fn_matches_rule() {
        let merge = price_merge_fn();
        let winner = merge(price("MSFT", 0, "a"), price("MSFT", 5, "b"));
        assert_eq!(winner.payload, json!({ "tag": "b" }));
    }

    #[test]
    fn validate_rejects_blank_instrument() {
        let value = price("   ", 0, "x");
        assert_eq!(value.validate(), Err(PriceValidationError::BlankInstrument));
    }

    #[test]
    fn validate_rejects_null_payload() {
        let value = PriceValue::new("AAPL", base_time(), serde_json::Value::Null);
        assert!(matches!(
            value.validate(),
            Err(PriceValidationError::MissingPayload { .. })
        ));
    }

    #[test]
    fn validate_accepts_well_formed_price() {
        assert!(price("AAPL", 0, "x").validate().is_ok());
    }

    #[test]
    fn instrument_key_display_and_conversions() {
        let key = InstrumentKey::from("BTC/USD");
        assert_eq!(key.to_string(), "BTC/USD");
        assert_eq!(key.as_str(), "BTC/USD");
        assert_eq!(InstrumentKey::from("BTC/USD".to_string()), key);
        assert!(!key.is_blank());
        assert!(InstrumentKey::new("").is_blank());
    }
}
