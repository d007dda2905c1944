use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use remedy_rag_server::{
    build_router, config::Settings, logging::init_logger, state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    init_logger(&settings.logging)?;

    info!("Starting remedy RAG server...");

    let state = AppState::build(&settings).await?;
    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
