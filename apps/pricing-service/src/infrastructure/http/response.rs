//! HTTP response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceValue;

/// Response from batch creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchResponse {
    /// Identifier of the new batch.
    pub batch_id: u64,
}

/// Response from chunk submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChunkResponse {
    /// Batch the chunk was applied to.
    pub batch_id: u64,
    /// Number of entries applied.
    pub accepted: usize,
}

/// Response from batch completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBatchResponse {
    /// Batch that was completed.
    pub batch_id: u64,
    /// "published" or "discarded".
    pub outcome: String,
    /// Instruments published.
    pub entries: usize,
}

/// Response from batch cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBatchResponse {
    /// Batch that was cancelled.
    pub batch_id: u64,
}

/// Latest price for an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    /// Instrument reference.
    pub ref_id: String,
    /// Effective time of the price.
    pub as_of: DateTime<Utc>,
    /// Price data as submitted.
    pub payload: serde_json::Value,
}

impl From<PriceValue> for PriceResponse {
    fn from(price: PriceValue) -> Self {
        Self {
            ref_id: price.instrument.to_string(),
            as_of: price.as_of,
            payload: price.payload,
        }
    }
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Batches currently open.
    pub open_batches: usize,
    /// Cancelled batches awaiting a follow-up complete.
    pub cancelled_batches: usize,
    /// Instruments with a latest price.
    pub instruments: usize,
}
