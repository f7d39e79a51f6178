//! Endpoint de broadcast GPS (SSE)
//!
//! Expone la última posición conocida de un vehículo como un stream de
//! eventos server-push de una sola vía. El endpoint sondea el cache con una
//! cadencia fija: la obsolescencia queda acotada a un intervalo de sondeo y
//! el cache no necesita lógica de fan-out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::PositionStore;
use crate::models::CachedPosition;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Mensaje para un vehículo que todavía no reportó. No es un error: la UI lo
/// usa para distinguir "nunca reportó" de "falló la consulta".
pub const GPS_NOT_FOUND_MESSAGE: &str = "Chưa có thông tin GPS";

/// Parámetros de suscripción SSE
#[derive(Debug, Deserialize)]
pub struct SseParams {
    /// Matrícula del vehículo a seguir
    pub l: Option<String>,
}

/// Mensajes que produce el sondeo del cache, antes de codificarse como SSE
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastMessage {
    /// Ack inmediato de suscripción
    Connected,
    /// Última posición cacheada del vehículo
    Position(CachedPosition),
    /// El vehículo nunca reportó (estado normal, no un error)
    NotFound,
}

/// `GET /gps/sse?l=<matrícula>`
pub async fn gps_events(
    Query(params): Query<SseParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let plate = params.l.unwrap_or_default();
    if plate.trim().is_empty() {
        return Err(AppError::BadRequest(
            "query parameter 'l' (matrícula) es obligatorio".to_string(),
        ));
    }

    let store: Arc<dyn PositionStore> = Arc::new(state.cache.clone());
    // interval() entra en pánico con duración cero
    let poll_interval = Duration::from_millis(state.config.sse_poll_interval_ms.max(1));

    let stream = broadcast_stream(store, plate, poll_interval)
        .map(|message| Ok::<Event, Infallible>(sse_event(message)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Stream de mensajes de broadcast para una matrícula.
///
/// Emite `Connected` al abrir y después, en cada intervalo, `Position` con la
/// posición cacheada o `NotFound` si el vehículo nunca reportó. Cuando el
/// cliente se desconecta, axum descarta el stream y con él el timer de
/// sondeo: no quedan pollers colgando contra el cache.
pub fn broadcast_stream(
    store: Arc<dyn PositionStore>,
    plate: String,
    poll_interval: Duration,
) -> impl Stream<Item = BroadcastMessage> + Send + 'static {
    let subscription_id = Uuid::new_v4();

    async_stream::stream! {
        info!("📺 Suscripción SSE {} para {}", subscription_id, plate);

        yield BroadcastMessage::Connected;

        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;

            match store.latest_position(&plate).await {
                Ok(Some(position)) => {
                    yield BroadcastMessage::Position(position);
                }
                Ok(None) => {
                    yield BroadcastMessage::NotFound;
                }
                Err(e) => {
                    // Cache caído: se loguea y se salta este sondeo
                    warn!("⚠️ Error consultando cache para {}: {}", plate, e);
                }
            }
        }
    }
}

/// Codificar un mensaje de broadcast como evento SSE con nombre
fn sse_event(message: BroadcastMessage) -> Event {
    match message {
        BroadcastMessage::Connected => Event::default().data("Connected"),
        BroadcastMessage::Position(position) => {
            let json = serde_json::to_string(&position).unwrap_or_else(|e| {
                warn!(
                    "⚠️ No se pudo serializar la posición de {}: {}",
                    position.license_number, e
                );
                "{}".to_string()
            });
            Event::default().event("gps").data(json)
        }
        BroadcastMessage::NotFound => Event::default()
            .event("gps_not_found")
            .data(GPS_NOT_FOUND_MESSAGE),
    }
}
