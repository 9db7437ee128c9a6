//! Persistence adapters.
//!
//! Prices live in memory only; nothing survives a restart.

mod in_memory;

pub use in_memory::InMemoryPriceStore;
