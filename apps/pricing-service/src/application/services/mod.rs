//! Application Services
//!
//! - `BatchRegistry`: Issues batch ids, routes chunks, and resolves batches

mod batch_registry;

pub use batch_registry::{
    BatchRegistry, Completion, DEFAULT_TOMBSTONE_LIMIT, PriceBatch, RegistryError,
};
