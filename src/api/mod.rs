//! API endpoints
//!
//! Este módulo contiene los endpoints HTTP del servicio de tracking.

pub mod gps;
pub mod health;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Crear el router principal de la API
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/gps/sse", get(gps::gps_events))
}
