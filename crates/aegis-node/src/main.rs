//! Aegis Node Binary
//!
//! Risk circuit-breaker and liquidation backstop engine

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aegis_node::{api::create_rest_api, AegisConfig, AegisCore, CoreDeps, EngineSnapshot, NODE_VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Aegis node v{}", NODE_VERSION);

    let config = AegisConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        collateral = %config.market.collateral_asset,
        debt = %config.market.debt_asset,
        ceiling = %config.market.utilization_ceiling,
        "Configuration loaded"
    );

    let core = Arc::new(AegisCore::new(&config, CoreDeps::from_config(&config)?)?);

    if let Some(path) = &config.storage.snapshot_path {
        match EngineSnapshot::load(path)? {
            Some(snapshot) => core.restore(snapshot),
            None => info!(path = %path.display(), "No snapshot found, starting fresh"),
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_rest_api(core.clone());

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal");
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if let Some(path) = &config.storage.snapshot_path {
        core.snapshot().save(path)?;
    }

    info!("Shutting down Aegis node");
    Ok(())
}
