use std::sync::Arc;

use anyhow::Context;

use stockhold_infra::{EngineConfig, ExpirySweeper};

const ENV_BIND_ADDR: &str = "STOCKHOLD_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockhold_observability::init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let bind_addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let engine = Arc::new(stockhold_api::app::build_engine(&config));
    let sweeper = ExpirySweeper::spawn("expiry-sweeper", engine.clone(), config.sweep_interval)
        .context("failed to start expiry sweeper")?;

    let app = stockhold_api::app::build_app(engine);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        reservation_ttl_secs = config.reservation_ttl.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        max_attempts = config.max_attempts,
        "listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await;

    tracing::info!("shutting down expiry sweeper");
    tokio::task::spawn_blocking(move || sweeper.shutdown())
        .await
        .context("expiry sweeper shutdown task failed")?;

    served.context("server error")
}
