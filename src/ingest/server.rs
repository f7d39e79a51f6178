//! Servidor de ingest GPS
//!
//! Termina conexiones TCP persistentes de dispositivos/simuladores. Cada
//! conexión manda frames JSON delimitados por línea y puede reportar muchos
//! vehículos a lo largo de su vida. Un frame malformado se responde con
//! `{"error": "..."}` por la misma conexión y el socket sigue vivo: un dato
//! malo nunca tumba la conexión ni el proceso.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::broker::EventPublisher;
use crate::models::{IngestFrame, PositionEvent};
use crate::utils::validation::is_standard_plate;

/// Capacidad de la cola de reenvío por conexión. Si el broker se atasca la
/// cola se llena y los eventos se descartan con warning: la ingesta de frames
/// no se bloquea nunca por un downstream lento.
const FORWARD_QUEUE: usize = 256;

/// Parsear y validar un frame crudo. Puro y síncrono: la publicación la hace
/// el llamador. Devuelve el mensaje de error para el frame rechazado.
pub fn process_frame(raw: &str) -> Result<PositionEvent, String> {
    let frame: IngestFrame =
        serde_json::from_str(raw).map_err(|e| format!("invalid frame: {}", e))?;
    frame
        .data
        .validate()
        .map_err(|e| format!("invalid event: {}", e))?;
    Ok(frame.data)
}

/// Loop de aceptación del servidor de ingest
pub async fn run(listener: TcpListener, publisher: Arc<dyn EventPublisher>) {
    match listener.local_addr() {
        Ok(addr) => info!("📡 Ingest GPS escuchando en {}", addr),
        Err(_) => info!("📡 Ingest GPS escuchando"),
    }

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let publisher = publisher.clone();
                tokio::spawn(handle_connection(socket, addr, publisher));
            }
            Err(e) => {
                error!("❌ Error aceptando conexión de ingest: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Atender una conexión: leer frames, validar, reenviar al broker.
///
/// La publicación corre en una tarea aparte alimentada por un canal, así el
/// loop de lectura no espera al broker y el orden de los eventos de la
/// conexión se conserva (todos los eventos de un vehículo llegan por la misma
/// conexión, y el stream los ordena en llegada).
async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    publisher: Arc<dyn EventPublisher>,
) {
    let conn_id = Uuid::new_v4();
    info!("🔌 Conexión de ingest {} desde {}", conn_id, addr);

    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let (tx, mut rx) = mpsc::channel::<PositionEvent>(FORWARD_QUEUE);
    let forwarder = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = publisher.publish(&event).await {
                // Degradar: se pierde este evento, el próximo lo corrige
                warn!(
                    "⚠️ Publicación descartada para {}: {}",
                    event.license_number, e
                );
            }
        }
    });

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }

                match process_frame(&line) {
                    Ok(event) => {
                        if !is_standard_plate(&event.license_number) {
                            debug!(
                                "🔎 Matrícula fuera de formato estándar en {}: '{}'",
                                conn_id, event.license_number
                            );
                        }
                        debug!(
                            "✅ Evento aceptado en {}: {}",
                            conn_id, event.license_number
                        );

                        if let Err(e) = tx.try_send(event) {
                            warn!("⚠️ Cola de reenvío llena en {}, evento descartado: {}", conn_id, e);
                        }
                    }
                    Err(message) => {
                        warn!("🚫 Frame rechazado en {}: {}", conn_id, message);
                        let reply = serde_json::json!({ "error": message }).to_string() + "\n";
                        if write_half.write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                }
            }
            // EOF: el dispositivo cerró la conexión
            Ok(None) => break,
            Err(e) => {
                warn!("⚠️ Error de lectura en {}: {}", conn_id, e);
                break;
            }
        }
    }

    // Cerrar el canal drena la cola pendiente y termina el forwarder
    drop(tx);
    let _ = forwarder.await;
    info!("🔌 Conexión de ingest {} cerrada", conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_frame_is_accepted() {
        let event = process_frame(
            r#"{"type":"update_position","data":{"licenseNumber":"51H-12345","lat":10.0,"lng":106.0}}"#,
        )
        .expect("frame válido");
        assert_eq!(event.license_number, "51H-12345");
    }

    #[test]
    fn frame_without_type_is_accepted() {
        let result =
            process_frame(r#"{"data":{"licenseNumber":"51H-12345","last_position":[10.0,106.0]}}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn non_json_frame_is_rejected_with_message() {
        let err = process_frame("esto no es json").unwrap_err();
        assert!(err.contains("invalid frame"));
    }

    #[test]
    fn frame_without_position_is_rejected() {
        let err = process_frame(r#"{"data":{"licenseNumber":"51H-12345","speed":50.0}}"#)
            .unwrap_err();
        assert!(err.contains("invalid event"));
    }

    #[test]
    fn frame_with_empty_plate_is_rejected() {
        let err = process_frame(r#"{"data":{"licenseNumber":"","lat":1.0,"lng":2.0}}"#)
            .unwrap_err();
        assert!(err.contains("invalid event"));
    }
}
