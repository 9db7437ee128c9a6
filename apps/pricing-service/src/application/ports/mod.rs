//! Port Interfaces
//!
//! Defines the contracts infrastructure adapters implement, following the
//! Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `PriceStore`: Latest-value index that completed batches publish into

mod price_store_port;

pub use price_store_port::{PriceLookupError, PriceSnapshot, PriceStore};
