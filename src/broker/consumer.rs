//! Consumidor del broker de eventos
//!
//! Lee el stream de posiciones con un consumer group (entrega at-least-once)
//! y vuelca cada evento al cache de posiciones. La escritura en cache es una
//! sobreescritura idempotente, así que una reentrega simplemente reescribe el
//! mismo valor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{PositionStore, RedisClient};
use crate::models::PositionEvent;

/// Lote máximo por lectura y bloqueo del XREADGROUP
const READ_COUNT: usize = 16;
const BLOCK_MS: usize = 5_000;

/// Pausa tras un error de broker antes de reintentar
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Normalizar un payload del stream y escribirlo en el cache.
/// Devuelve `true` si la posición quedó almacenada. Los fallos se loguean y
/// se descartan: el tracking se degrada a "reintentar con el próximo evento",
/// nunca bloquea el loop del consumidor.
pub async fn apply_payload<S: PositionStore + ?Sized>(store: &S, payload: &str) -> bool {
    let event: PositionEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("⚠️ Payload indescifrable en el stream, se descarta: {}", e);
            return false;
        }
    };

    let cached = match event.to_cached() {
        Some(cached) => cached,
        None => {
            warn!(
                "⚠️ Evento sin posición resoluble para {}, se descarta",
                event.license_number
            );
            return false;
        }
    };

    match store.store_position(&cached).await {
        Ok(()) => {
            debug!(
                "📍 Posición actualizada: {} -> ({}, {})",
                cached.license_number, cached.lat, cached.lng
            );
            true
        }
        Err(e) => {
            warn!(
                "⚠️ No se pudo escribir la posición de {} en cache: {}",
                cached.license_number, e
            );
            false
        }
    }
}

/// Consumidor del stream de posiciones
pub struct StreamConsumer {
    conn: ConnectionManager,
    stream_key: String,
    group: String,
    consumer_name: String,
}

impl StreamConsumer {
    pub fn new(
        client: &RedisClient,
        stream_key: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            conn: client.manager(),
            stream_key: stream_key.into(),
            group: group.into(),
            consumer_name: format!("tracker-{}", Uuid::new_v4()),
        }
    }

    /// Crear el consumer group si no existe (BUSYGROUP = ya estaba)
    async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let result: RedisResult<String> = conn
            .xgroup_create_mkstream(&self.stream_key, &self.group, "$")
            .await;

        match result {
            Ok(_) => {
                info!(
                    "📡 Consumer group '{}' creado sobre {}",
                    self.group, self.stream_key
                );
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("📡 Consumer group '{}' ya existía", self.group);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loop principal: leer, aplicar al cache, ack.
    /// Un broker caído se loguea y se reintenta con backoff fijo; el proceso
    /// sigue sirviendo el resto del pipeline mientras tanto.
    pub async fn run<S: PositionStore + ?Sized>(self, store: Arc<S>) {
        info!(
            "🚚 Consumidor '{}' escuchando {} (grupo: {})",
            self.consumer_name, self.stream_key, self.group
        );

        // Al salir del loop interno por un error se vuelve a asegurar el
        // grupo: cubre el caso de un Redis vaciado o recreado
        loop {
            if let Err(e) = self.ensure_group().await {
                error!("❌ No se pudo preparar el consumer group: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }

            loop {
                let opts = StreamReadOptions::default()
                    .group(&self.group, &self.consumer_name)
                    .count(READ_COUNT)
                    .block(BLOCK_MS);

                let mut conn = self.conn.clone();
                let reply: RedisResult<StreamReadReply> = conn
                    .xread_options(&[self.stream_key.as_str()], &[">"], &opts)
                    .await;

                let reply = match reply {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!("❌ Error leyendo el stream {}: {}", self.stream_key, e);
                        tokio::time::sleep(RETRY_DELAY).await;
                        break;
                    }
                };

                for stream in reply.keys {
                    for entry in stream.ids {
                        match entry.get::<String>("payload") {
                            Some(payload) => {
                                apply_payload(store.as_ref(), &payload).await;
                            }
                            None => {
                                warn!("⚠️ Entrada {} sin campo payload, se descarta", entry.id);
                            }
                        }

                        // Ack incondicional: un payload inválido no se
                        // reintenta, y un fallo de cache se recupera con el
                        // próximo evento
                        let ack: RedisResult<i64> = conn
                            .xack(&self.stream_key, &self.group, &[entry.id.as_str()])
                            .await;
                        if let Err(e) = ack {
                            warn!("⚠️ No se pudo hacer ack de {}: {}", entry.id, e);
                        }
                    }
                }
            }
        }
    }
}
