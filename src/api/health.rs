//! Health check del servicio

use axum::{extract::State, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` - estado del servicio y conectividad a Redis
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let redis_connected = state.cache.client().is_connected().await;

    Json(json!({
        "service": "gps-tracking",
        "status": if redis_connected { "healthy" } else { "degraded" },
        "redis": redis_connected,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
