//! Web server exposing the actuator commands and the sensor stream.
//!
//! Plain GET endpoints drive the servo; `/sensor` upgrades to a WebSocket
//! that receives one JSON reading per sample interval.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;
pub use state::AppState;

use crate::error::{Result, SystemError};
use std::net::SocketAddr;
use tracing::info;

/// Serve `state` until its shutdown token is cancelled.
pub async fn start_web_server(config: WebConfig, state: AppState) -> Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_app(&config, state)?;

    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SystemError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Starting pi_sentry web server on http://{}", addr);
    info!("Actuator endpoints: /loiter, /rotate-right, /rotate-left, /status");
    info!("Sensor stream: ws://{}/sensor", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SystemError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SystemError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
