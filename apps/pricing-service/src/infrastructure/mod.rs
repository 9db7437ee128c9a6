//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports plus the ambient
//! concerns of the running service.

/// Configuration loaded from the environment.
pub mod config;

/// HTTP/REST API adapter.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// In-memory latest-value price store.
pub mod persistence;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
