//! Domain Layer - Price values, conflict rules, and batch accumulation.
//!
//! Pure in-memory logic with no transport or runtime dependencies.

/// Instrument keys, price values, and the merge rule that compacts them.
pub mod pricing;

/// Batch identifiers and the generic compacting accumulator.
pub mod batch;
