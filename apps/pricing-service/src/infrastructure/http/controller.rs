//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the batch registry and the price
//! store.
//!
//! # Endpoints
//!
//! - `POST /pricing/batches` - Open a batch
//! - `POST /pricing/batches/{id}` - Submit a chunk of prices
//! - `POST /pricing/batches/{id}/complete` - Complete a batch
//! - `DELETE /pricing/batches/{id}` - Cancel a batch
//! - `GET /pricing/instruments/{ref_id}/price` - Latest price
//! - `GET /health`, `GET /healthz`, `GET /metrics`

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::error::ApiError;
use super::request::PriceDataChunk;
use super::response::{
    CancelBatchResponse, CompleteBatchResponse, CreateBatchResponse, HealthResponse,
    PriceResponse, SubmitChunkResponse,
};
use crate::application::ports::PriceStore;
use crate::application::services::{BatchRegistry, RegistryError};
use crate::domain::batch::BatchId;
use crate::domain::pricing::InstrumentKey;
use crate::infrastructure::metrics::{self, ChunkOutcome, get_metrics_handle};

/// Application state shared across handlers.
pub struct AppState<S: PriceStore> {
    /// Batch registry, which also owns the price store.
    pub registry: Arc<BatchRegistry<S>>,
    /// Application version.
    pub version: String,
    /// Process start time.
    pub started_at: Instant,
}

impl<S: PriceStore> AppState<S> {
    /// Create handler state around a registry.
    #[must_use]
    pub fn new(registry: Arc<BatchRegistry<S>>, version: impl Into<String>) -> Self {
        Self {
            registry,
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

impl<S: PriceStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S: PriceStore>(state: AppState<S>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check::<S>))
        .route("/healthz", get(liveness))
        .route("/metrics", get(metrics_endpoint))
        .route("/pricing/batches", post(create_batch::<S>))
        .route(
            "/pricing/batches/{id}",
            post(submit_chunk::<S>).delete(cancel_batch::<S>),
        )
        .route("/pricing/batches/{id}/complete", post(complete_batch::<S>))
        .route("/pricing/instruments/{ref_id}/price", get(latest_price::<S>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn create_batch<S: PriceStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let id = state.registry.create_batch();

    metrics::record_batch_created();
    metrics::set_open_batches(state.registry.open_batches());

    Json(CreateBatchResponse { batch_id: id.get() })
}

// Body is decoded before the id is consulted: a missing or corrupt body is
// a 400 even for an unknown batch.
async fn submit_chunk<S: PriceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<u64>,
    body: Result<Json<PriceDataChunk>, JsonRejection>,
) -> Result<Json<SubmitChunkResponse>, ApiError> {
    let Json(chunk) = body.inspect_err(|_| metrics::record_chunk(ChunkOutcome::Rejected, 0))?;
    let id = BatchId::new(id);

    match state.registry.add_chunk(id, chunk.into_prices()) {
        Ok(accepted) => {
            metrics::record_chunk(ChunkOutcome::Accepted, accepted);
            Ok(Json(SubmitChunkResponse {
                batch_id: id.get(),
                accepted,
            }))
        }
        Err(e) => {
            let outcome = match e {
                RegistryError::BatchNotFound(_) => ChunkOutcome::NotFound,
                _ => ChunkOutcome::Rejected,
            };
            metrics::record_chunk(outcome, 0);
            Err(e.into())
        }
    }
}

async fn complete_batch<S: PriceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<u64>,
) -> Result<Json<CompleteBatchResponse>, ApiError> {
    let id = BatchId::new(id);
    let completion = state.registry.complete(id)?;

    metrics::record_batch_completed(completion);
    metrics::set_open_batches(state.registry.open_batches());
    metrics::set_instruments(state.registry.store().len());

    Ok(Json(CompleteBatchResponse {
        batch_id: id.get(),
        outcome: completion.as_str().to_string(),
        entries: completion.entries(),
    }))
}

async fn cancel_batch<S: PriceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<u64>,
) -> Result<Json<CancelBatchResponse>, ApiError> {
    let id = BatchId::new(id);
    state.registry.cancel(id)?;

    metrics::record_batch_cancelled();
    metrics::set_open_batches(state.registry.open_batches());

    Ok(Json(CancelBatchResponse { batch_id: id.get() }))
}

async fn latest_price<S: PriceStore>(
    State(state): State<AppState<S>>,
    Path(ref_id): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let price = state
        .registry
        .store()
        .get_latest(&InstrumentKey::from(ref_id))?;
    Ok(Json(price.into()))
}

async fn health_check<S: PriceStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        open_batches: state.registry.open_batches(),
        cancelled_batches: state.registry.cancelled_batches(),
        instruments: state.registry.store().len(),
    })
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_endpoint() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}
