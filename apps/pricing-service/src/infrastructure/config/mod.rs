//! Configuration Module
//!
//! Configuration loading for the pricing service.

mod settings;

pub use settings::{BatchSettings, ConfigError, Environment, ServerSettings, ServiceConfig};
