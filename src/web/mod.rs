//! Publication sinks for the health record.
//!
//! `GET /health` serves the current record, `/ws` pushes a `health-update`
//! event to members of the `health` topic after every sampler tick, and
//! `GET /api/status` describes the service itself.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;
pub use websocket::ClientRegistry;

use crate::error::{HealthError, Result};
use crate::metrics::{Capabilities, MetricsStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state handed to every handler. Holds only read access to the
/// health record.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: MetricsStore,
    pub capabilities: Capabilities,
    pub clients: ClientRegistry,
    pub max_websocket_connections: usize,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: &WebConfig,
        store: MetricsStore,
        capabilities: Capabilities,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            capabilities,
            clients: ClientRegistry::new(),
            max_websocket_connections: config.max_websocket_connections,
            shutdown,
        }
    }
}

/// Serve the pull and push sinks until `shutdown` fires.
pub async fn start_web_server(
    config: WebConfig,
    store: MetricsStore,
    capabilities: Capabilities,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::new(&config, store, capabilities, shutdown.clone());
    let app = create_app(&config, state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HealthError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Starting host pulse web server on http://{}", addr);
    info!("Health endpoint: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| HealthError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
