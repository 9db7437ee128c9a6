//! Application Layer - Batch lifecycle orchestration and port definitions.
//!
//! This layer wires domain accumulators to the latest-value store through
//! the `PriceStore` port and enforces the batch lifecycle seen by callers.

/// Port interfaces for the latest-value store.
pub mod ports;

/// Application services: the batch registry.
pub mod services;
