//! Sentinel Agent - anomaly detection service
//!
//! Serves the engine's ingest, detection and anomaly lifecycle operations
//! over HTTP, alongside health probes and Prometheus metrics.

use anyhow::Result;
use sentinel_agent::{api, config::AgentConfig};
use sentinel_lib::{health::components, SentinelEngine};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting sentinel-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        port = config.api_port,
        data_dir = ?config.data_dir,
        "Agent configured"
    );

    // Loading persisted documents reads the disk
    let engine_config = config.engine_config();
    let engine =
        Arc::new(tokio::task::spawn_blocking(move || SentinelEngine::open(engine_config)).await?);

    let health = engine.health().clone();
    health.register(components::API);

    let app_state = Arc::new(api::AppState::new(engine.clone()));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    health.set_ready(true);

    tokio::select! {
        result = &mut api_handle => {
            health.set_unhealthy(components::API, "API server stopped");
            match result {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            engine.logger().log_shutdown("API server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            health.set_ready(false);
            engine.logger().log_shutdown("SIGINT received");
            api_handle.abort();
        }
    }

    info!("Shutting down");
    Ok(())
}
