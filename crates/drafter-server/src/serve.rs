use crate::config::DrafterConfig;
use crate::http::{create_router, AppState};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub async fn run(config: DrafterConfig) -> anyhow::Result<()> {
    info!("Starting drafter v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP: {}", config.server.bind);
    info!("Data: {:?}", config.db_path());
    info!("Model: {} at {}", config.model.model, config.model.base_url);

    let errors = config.validate();
    if !errors.is_empty() {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }
    if config.model.api_key().is_none() {
        warn!("{} is not set; model calls may be rejected", config.model.api_key_env);
    }

    let session = crate::session::open(&config)?;
    let app = create_router(AppState::new(session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config.server.bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
