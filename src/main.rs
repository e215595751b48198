//! RSVP server
//!
//! Serves the shared RSVP collection over HTTP with SQLite persistence.

use std::sync::Arc;

use rsvp_invitation::config::Config;
use rsvp_invitation::db::{self, Repository};
use rsvp_invitation::{create_router, init_tracing, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    init_tracing(&config.log_level, config.log_format);

    tracing::info!("Starting RSVP server");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let entries = repo.list_entries().await?;
    tracing::info!(
        "Loaded {} RSVP entries at revision {}",
        entries.len(),
        repo.get_revision_id().await?
    );

    let state = AppState { repo };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
