//! Modelos del pipeline GPS
//!
//! Este módulo contiene el evento de posición que viaja por todo el pipeline
//! (dispositivo -> ingest -> broker -> cache -> SSE) y su proyección
//! normalizada en cache.
//!
//! El formato de cable admite dos codificaciones de posición: campos planos
//! `lat`/`lng` (UI, simulador) o la tupla `last_position: [lat, lng]` que
//! reportan los dispositivos. Tras la validación se resuelve UNA sola
//! representación canónica y el resto del pipeline no vuelve a ramificar.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::errors::AppResult;

/// Estado grueso de movimiento reportado por el productor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Running,
    Stopped,
}

/// Clasificación de comportamiento derivada de la velocidad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    Speeding,
}

impl Behavior {
    /// Clasificar según el umbral configurado (km/h)
    pub fn classify(speed_kmh: f64, threshold_kmh: f64) -> Self {
        if speed_kmh > threshold_kmh {
            Behavior::Speeding
        } else {
            Behavior::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Behavior::Normal => "NORMAL",
            Behavior::Speeding => "SPEEDING",
        }
    }
}

/// Evento de posición: el mensaje canónico del pipeline.
///
/// Solo `licenseNumber` y una posición (plana o `last_position`) son
/// obligatorios; el resto es best-effort porque un dispositivo real puede no
/// conocer aún sus métricas derivadas.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_position_presence", skip_on_field_errors = false))]
pub struct PositionEvent {
    #[serde(rename = "licenseNumber")]
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub license_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    /// Codificación de dispositivo: `[lat, lng]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<(f64, f64)>,

    /// Velocidad instantánea en km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Distancia acumulada en km (los dispositivos viejos mandan `distance`)
    #[serde(default, alias = "distance", skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MovementStatus>,

    /// Ej. "NORMAL" | "SPEEDING"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,

    /// Epoch millis del productor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_running: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_stopped: Option<i64>,
}

/// Al menos una de las dos codificaciones de posición debe estar presente
fn validate_position_presence(event: &PositionEvent) -> Result<(), ValidationError> {
    if event.last_position.is_some() || (event.lat.is_some() && event.lng.is_some()) {
        return Ok(());
    }
    let mut error = ValidationError::new("position_missing");
    error.message = Some("se requiere lat/lng o last_position".into());
    Err(error)
}

impl PositionEvent {
    /// Parsear y validar un frame crudo.
    /// Nunca lanza pánico: JSON malformado o schema inválido devuelven un
    /// error que indica qué campo falló.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let event: PositionEvent = serde_json::from_str(raw)?;
        event.validate()?;
        Ok(event)
    }

    /// Resolver la posición canónica `(lat, lng)`.
    /// Si llegan ambas codificaciones gana `last_position` (es la lectura
    /// del dispositivo, los campos planos pueden venir de la UI).
    pub fn position(&self) -> Option<(f64, f64)> {
        if let Some(pos) = self.last_position {
            return Some(pos);
        }
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Proyección normalizada para el cache de posiciones.
    /// Devuelve `None` si el evento no trae posición resoluble.
    pub fn to_cached(&self) -> Option<CachedPosition> {
        let (lat, lng) = self.position()?;
        Some(CachedPosition {
            license_number: self.license_number.clone(),
            lat,
            lng,
            speed: self.speed,
            total_distance: self.total_distance,
            state: self.state,
            behavior: self.behavior.clone(),
            timestamp: self.timestamp,
        })
    }
}

/// Última posición conocida de un vehículo: una fila por matrícula.
/// Se sobreescribe completa en cada evento aceptado (last-write-wins,
/// nunca se mezclan campos de eventos distintos).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPosition {
    #[serde(rename = "licenseNumber")]
    pub license_number: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<MovementStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Frame entrante del socket de ingest.
/// El campo `type` se acepta por compatibilidad hacia adelante pero un
/// consumidor mínimo puede ignorarlo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub data: PositionEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_flat_coordinates() {
        let event = PositionEvent::parse(r#"{"licenseNumber":"51H-12345","lat":10.0,"lng":106.0}"#)
            .expect("evento plano válido");
        assert_eq!(event.position(), Some((10.0, 106.0)));
    }

    #[test]
    fn accepts_device_tuple_encoding() {
        let event = PositionEvent::parse(
            r#"{"licenseNumber":"51H-12345","last_position":[10.5,106.7],"speed":42.0}"#,
        )
        .expect("evento de dispositivo válido");
        assert_eq!(event.position(), Some((10.5, 106.7)));
        assert_eq!(event.speed, Some(42.0));
    }

    #[test]
    fn device_tuple_wins_over_flat_fields() {
        let event = PositionEvent::parse(
            r#"{"licenseNumber":"51H-12345","lat":1.0,"lng":2.0,"last_position":[10.5,106.7]}"#,
        )
        .unwrap();
        let cached = event.to_cached().unwrap();
        assert_eq!((cached.lat, cached.lng), (10.5, 106.7));
    }

    #[test]
    fn rejects_missing_position() {
        let result = PositionEvent::parse(r#"{"licenseNumber":"51H-12345","speed":50.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_license_number() {
        let result = PositionEvent::parse(r#"{"licenseNumber":"","lat":10.0,"lng":106.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_license_number() {
        let result = PositionEvent::parse(r#"{"lat":10.0,"lng":106.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_partial_flat_position() {
        // solo lat sin lng no es una posición resoluble
        let result = PositionEvent::parse(r#"{"licenseNumber":"51H-12345","lat":10.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_legacy_distance_alias() {
        let event =
            PositionEvent::parse(r#"{"licenseNumber":"51H-12345","lat":1.0,"lng":2.0,"distance":12.5}"#)
                .unwrap();
        assert_eq!(event.total_distance, Some(12.5));
    }

    #[test]
    fn parses_movement_state() {
        let event = PositionEvent::parse(
            r#"{"licenseNumber":"51H-12345","lat":1.0,"lng":2.0,"state":"running"}"#,
        )
        .unwrap();
        assert_eq!(event.state, Some(MovementStatus::Running));
    }

    #[test]
    fn behavior_classification_threshold() {
        assert_eq!(Behavior::classify(80.0, 80.0), Behavior::Normal);
        assert_eq!(Behavior::classify(80.1, 80.0), Behavior::Speeding);
        assert_eq!(Behavior::classify(0.0, 80.0), Behavior::Normal);
    }

    #[test]
    fn ingest_frame_type_is_optional() {
        let frame: IngestFrame = serde_json::from_str(
            r#"{"data":{"licenseNumber":"51H-12345","lat":1.0,"lng":2.0}}"#,
        )
        .unwrap();
        assert!(frame.kind.is_none());

        let frame: IngestFrame = serde_json::from_str(
            r#"{"type":"update_position","data":{"licenseNumber":"51H-12345","lat":1.0,"lng":2.0}}"#,
        )
        .unwrap();
        assert_eq!(frame.kind.as_deref(), Some("update_position"));
    }

    #[test]
    fn cached_position_roundtrip_keeps_wire_names() {
        let cached = CachedPosition {
            license_number: "51H-12345".to_string(),
            lat: 10.0,
            lng: 106.0,
            speed: Some(30.0),
            total_distance: Some(1.2),
            state: Some(MovementStatus::Running),
            behavior: Some("NORMAL".to_string()),
            timestamp: Some(1_700_000_000_000),
        };
        let json = serde_json::to_string(&cached).unwrap();
        assert!(json.contains("\"licenseNumber\":\"51H-12345\""));
        let back: CachedPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cached);
    }
}
