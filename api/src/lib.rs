//! Webhook HTTP surface for auto-lgtm.
//!
//! Exposes a health probe and the GitHub webhook endpoint; reviews are
//! spawned as background tasks so the webhook answers immediately.

use std::sync::Arc;
use std::{env, error::Error};

mod routes;
mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use crate::routes::{health::health_check, webhook::github_webhook};
use crate::state::AppState;

pub async fn start() -> Result<(), Box<dyn Error>> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let state = Arc::new(AppState::from_env()?);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(github_webhook))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&host_url).await?;
    tracing::info!("webhook server listening on {host_url}");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
