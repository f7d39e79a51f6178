//! Productor del broker de eventos
//!
//! Publica eventos de posición validados en el stream de Redis. Un stream es
//! un log append-only con orden total, así que el orden por vehículo queda
//! garantizado sin particionado explícito.

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::cache::RedisClient;
use crate::models::PositionEvent;

/// Costura de publicación: el ingest escribe a través de este trait
/// y los tests lo implementan con un colector en memoria.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &PositionEvent) -> Result<()>;
}

/// Productor sobre un stream de Redis (`XADD`)
#[derive(Clone)]
pub struct StreamProducer {
    conn: ConnectionManager,
    stream_key: String,
}

impl StreamProducer {
    pub fn new(client: &RedisClient, stream_key: impl Into<String>) -> Self {
        Self {
            conn: client.manager(),
            stream_key: stream_key.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for StreamProducer {
    async fn publish(&self, event: &PositionEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();

        let entry_id: String = conn
            .xadd(
                &self.stream_key,
                "*",
                &[
                    ("plate", event.license_number.as_str()),
                    ("payload", payload.as_str()),
                ],
            )
            .await?;

        debug!(
            "📤 Evento publicado en {} (id: {}, matrícula: {})",
            self.stream_key, entry_id, event.license_number
        );
        Ok(())
    }
}
