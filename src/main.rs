//! Notes server with AI summaries.
//!
//! Loads configuration from the environment, builds the auth, store and
//! summarizer collaborators, and serves the router from the library.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use notes_summary::{build_router, AppConfig, AppState};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,notes_summary=debug")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    let bind_addr = config.bind_addr;
    let backend = config.backend;
    let state = Arc::new(AppState::from_config(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!(addr = %bind_addr, ?backend, "Notes server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
