//! Ruta de simulación
//!
//! Una ruta vive solo en el lado cliente: waypoints ordenados, el cursor del
//! waypoint que se está aproximando y la posición interpolada actual.

use serde::{Deserialize, Serialize};

/// Ruta de un vehículo simulado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "licenseNumber")]
    pub license_number: String,

    /// Waypoints `[lat, lng]` en orden de recorrido
    pub points: Vec<(f64, f64)>,

    /// Índice del waypoint que se está aproximando.
    /// Invariante: `next_target <= points.len()`; alcanzar `points.len()`
    /// significa ruta completa y el movimiento debe detenerse.
    #[serde(default)]
    pub next_target: usize,

    /// Posición interpolada actual `[lat, lng]`
    pub cur_pos: (f64, f64),
}

impl Route {
    /// Crear una ruta posicionada sobre su primer waypoint.
    /// Devuelve `None` si no hay waypoints: no hay nada que recorrer.
    pub fn new(license_number: impl Into<String>, points: Vec<(f64, f64)>) -> Option<Self> {
        let first = *points.first()?;
        Some(Self {
            license_number: license_number.into(),
            points,
            next_target: 0,
            cur_pos: first,
        })
    }

    /// Ruta recorrida por completo (sin wraparound)
    pub fn is_complete(&self) -> bool {
        self.next_target >= self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_first_waypoint() {
        let route = Route::new("51H-12345", vec![(10.0, 106.0), (10.0, 106.01)]).unwrap();
        assert_eq!(route.cur_pos, (10.0, 106.0));
        assert_eq!(route.next_target, 0);
        assert!(!route.is_complete());
    }

    #[test]
    fn empty_route_is_rejected() {
        assert!(Route::new("51H-12345", vec![]).is_none());
    }
}
