//! HTTP handlers for API endpoints.

use crate::metrics::HealthReport;
use crate::web::AppState;
use axum::extract::State;
use axum::response::Json;
use serde_json::json;
use tracing::debug;

/// Current health record. Reads the store only; never triggers sampling.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    let report = state.store.report().await;
    debug!(
        "CPU: {}%, Memory: {}%, Disk: {}%, Network: {} Mbps",
        report.cpu, report.memory, report.disk, report.network
    );
    Json(report)
}

/// Service status endpoint.
pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "capabilities": state.capabilities,
        "websocket": {
            "connected": state.clients.count().await,
            "health_members": state.clients.health_members().await,
            "clients": state.clients.describe().await,
        },
    }))
}
