//! HTTP request DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::pricing::PriceValue;

/// A chunk of price entries submitted to an open batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDataChunk {
    /// Entries in submission order.
    pub prices: Vec<PriceEntryRequest>,
}

/// A single price entry as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntryRequest {
    /// Instrument reference. Accepts a JSON string or integer.
    #[serde(deserialize_with = "deserialize_ref_id")]
    pub ref_id: String,
    /// Effective time of the price (RFC 3339).
    pub as_of: DateTime<Utc>,
    /// Opaque price data. Missing decodes as null and is rejected by
    /// chunk validation.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl From<PriceEntryRequest> for PriceValue {
    fn from(entry: PriceEntryRequest) -> Self {
        Self::new(entry.ref_id, entry.as_of, entry.payload)
    }
}

impl PriceDataChunk {
    /// Convert into domain prices, preserving order.
    #[must_use]
    pub fn into_prices(self) -> Vec<PriceValue> {
        self.prices.into_iter().map(PriceValue::from).collect()
    }
}

fn deserialize_ref_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RefId {
        Text(String),
        Number(u64),
    }

    Ok(match RefId::deserialize(deserializer)? {
        RefId::Text(text) => text,
        RefId::Number(number) => number.to_string(),
    })
}
