use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

use crate::bootstrap::build_state;
use crate::config::AppConfig;
use crate::rest::app_router;

/// Build the components, reconcile the collection, then serve until shutdown.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&config).context("failed to build components")?;

    let outcome = state
        .reconciler
        .ensure_collection(None)
        .await
        .context("failed to prepare the vector collection")?;
    info!(
        collection = %outcome.collection.name,
        dimensions = outcome.collection.dimensions,
        action = ?outcome.action,
        "vector collection ready"
    );

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("invalid SERVER_ADDR '{}'", config.server_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docqa-server listening on http://{}", addr);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
