//! Pricing Service Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin pricing-service
//! ```
//!
//! # Environment Variables
//!
//! - `PRICING_ENV`: development | production (default: development)
//! - `PRICING_HTTP_HOST`: Bind address (default: 0.0.0.0)
//! - `PRICING_HTTP_PORT`: HTTP port (default: 8080)
//! - `PRICING_MAX_BODY_BYTES`: Request body limit (default: 2 MiB)
//! - `PRICING_SHUTDOWN_TIMEOUT_SECS`: Graceful shutdown timeout (default: 30)
//! - `PRICING_MAX_CANCELLED_TOMBSTONES`: Cancelled ids remembered for a
//!   follow-up complete (default: 10000)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use pricing_service::{
    AppState, BatchRegistry, HttpServer, InMemoryPriceStore, ServiceConfig, create_router,
    init_metrics, init_telemetry,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = init_telemetry();

    tracing::info!("Starting pricing service");

    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env().context("invalid service configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = Arc::new(InMemoryPriceStore::new());
    let registry = Arc::new(
        BatchRegistry::new(store).with_tombstone_limit(config.batches.max_cancelled_tombstones),
    );
    let state = AppState::new(registry, env!("CARGO_PKG_VERSION"));
    let router = create_router(state, config.server.max_body_bytes);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let server = HttpServer::new(addr, router, shutdown_token.clone());
    let mut server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_handle => {
            // Server exited on its own, most likely a bind failure.
            result.context("HTTP server task panicked")??;
            return Ok(());
        }
        () = await_shutdown() => {}
    }

    shutdown_token.cancel();
    tracing::info!(
        timeout_secs = config.server.shutdown_timeout.as_secs(),
        "Graceful shutdown started"
    );

    match tokio::time::timeout(config.server.shutdown_timeout, server_handle).await {
        Ok(result) => result.context("HTTP server task panicked")??,
        Err(_) => tracing::warn!("Shutdown timeout elapsed, abandoning in-flight requests"),
    }

    tracing::info!("Pricing service stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        environment = config.environment.as_str(),
        host = %config.server.host,
        port = config.server.port,
        max_body_bytes = config.server.max_body_bytes,
        max_cancelled_tombstones = config.batches.max_cancelled_tombstones,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
