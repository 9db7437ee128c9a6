#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::cast_possible_wrap
    )
)]

//! Pricing Service - Batched Latest-Price Ingestion
//!
//! Accepts price updates for instruments in client-defined batches. A batch
//! is opened, receives chunks of prices, and is then either completed, which
//! publishes its compacted contents into the latest-value store, or
//! cancelled, which drops them.
//!
//! Repeated updates to the same instrument are compacted with one conflict
//! rule everywhere: a strictly later `as_of` wins, an exact tie keeps the
//! value already held.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: Price types and the compacting batch accumulator
//!   - `pricing`: Instrument keys, price values, merge rule
//!   - `batch`: Batch ids, lifecycle state, `CompactingBatch`
//!
//! - **Application**: Lifecycle orchestration and ports
//!   - `ports`: `PriceStore` contract
//!   - `services`: `BatchRegistry`
//!
//! - **Infrastructure**: Adapters and ambient concerns
//!   - `persistence`: In-memory price store
//!   - `http`: REST endpoints
//!   - `config`, `telemetry`, `metrics`
//!
//! # Data Flow
//!
//! ```text
//! POST chunk --> BatchRegistry --> CompactingBatch (per batch lock)
//!                                        |
//!                                   complete()
//!                                        v
//! GET price  <------------------- InMemoryPriceStore
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Price types and batch accumulation.
pub mod domain;

/// Application layer - Batch registry and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::batch::{BatchError, BatchId, BatchState, CompactingBatch, CompleteOutcome};
pub use domain::pricing::{
    InstrumentKey, MergeFn, PriceValidationError, PriceValue, latest_as_of, price_merge_fn,
};

// Application
pub use application::ports::{PriceLookupError, PriceSnapshot, PriceStore};
pub use application::services::{
    BatchRegistry, Completion, DEFAULT_TOMBSTONE_LIMIT, PriceBatch, RegistryError,
};

// Infrastructure
pub use infrastructure::config::{
    BatchSettings, ConfigError, Environment, ServerSettings, ServiceConfig,
};
pub use infrastructure::http::{AppState, HttpServer, create_router};
pub use infrastructure::metrics::init_metrics;
pub use infrastructure::persistence::InMemoryPriceStore;
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
