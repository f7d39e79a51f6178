//! Coordinador de la simulación
//!
//! Un mapa de matrícula -> estado de vehículo, cada registro mutable de forma
//! independiente, y un único coordinador que los recorre en cada tick. No hay
//! estado compartido entre vehículos: dentro de un tick se pueden procesar en
//! cualquier orden.

use std::collections::HashMap;
use std::time::Duration;

use crate::models::PositionEvent;

use super::route::Route;
use super::vehicle::VehicleSim;

/// Parámetros del motor de simulación
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Intervalo del timer global de ticks
    pub tick_interval: Duration,
    /// Umbral de SPEEDING en km/h
    pub speeding_threshold_kmh: f64,
    /// Tolerancia de snap al waypoint, en grados por eje
    pub snap_tolerance_deg: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            speeding_threshold_kmh: 80.0,
            snap_tolerance_deg: 0.001,
        }
    }
}

/// Motor de simulación: todos los vehículos simulados de una instancia
pub struct SimulationEngine {
    config: SimulationConfig,
    vehicles: HashMap<String, VehicleSim>,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            vehicles: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Cargar (o reemplazar) la ruta de un vehículo; arranca detenido
    pub fn load_route(&mut self, route: Route) {
        log::info!(
            "🗺️ Ruta cargada para {} ({} waypoints)",
            route.license_number,
            route.points.len()
        );
        self.vehicles
            .insert(route.license_number.clone(), VehicleSim::new(route));
    }

    /// Cambiar el flag de movimiento de un vehículo.
    /// Devuelve `false` si la matrícula no tiene ruta cargada.
    pub fn set_moving(&mut self, license_number: &str, moving: bool, now_ms: i64) -> bool {
        match self.vehicles.get_mut(license_number) {
            Some(vehicle) => {
                vehicle.set_moving(moving, now_ms);
                log::info!(
                    "🚦 {} -> {}",
                    license_number,
                    if vehicle.is_moving() { "en movimiento" } else { "detenido" }
                );
                true
            }
            None => {
                log::warn!("⚠️ Sin ruta cargada para {}", license_number);
                false
            }
        }
    }

    pub fn vehicle(&self, license_number: &str) -> Option<&VehicleSim> {
        self.vehicles.get(license_number)
    }

    pub fn plates(&self) -> Vec<String> {
        self.vehicles.keys().cloned().collect()
    }

    /// Un tick global: avanza todos los vehículos en movimiento y devuelve
    /// los eventos a reenviar al ingest.
    pub fn tick_all(&mut self, now_ms: i64) -> Vec<PositionEvent> {
        let mut events = Vec::new();
        for vehicle in self.vehicles.values_mut() {
            if let Some(event) = vehicle.tick(
                self.config.tick_interval,
                self.config.speeding_threshold_kmh,
                self.config.snap_tolerance_deg,
                now_ms,
            ) {
                events.push(event);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(SimulationConfig::default())
    }

    #[test]
    fn vehicles_tick_independently() {
        let mut engine = engine();
        engine.load_route(Route::new("51H-11111", vec![(10.0, 106.0), (10.0, 106.01)]).unwrap());
        engine.load_route(Route::new("51H-22222", vec![(21.0, 105.8), (21.0, 105.81)]).unwrap());

        engine.set_moving("51H-11111", true, 0);
        // el segundo vehículo queda detenido

        engine.tick_all(200); // snap inicial del primero
        let events = engine.tick_all(400);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].license_number, "51H-11111");
        assert_eq!(engine.vehicle("51H-22222").unwrap().distance(), 0.0);
    }

    #[test]
    fn toggle_unknown_plate_is_reported() {
        let mut engine = engine();
        assert!(!engine.set_moving("00X-00000", true, 0));
    }

    #[test]
    fn reload_route_resets_vehicle_state() {
        let mut engine = engine();
        engine.load_route(Route::new("51H-11111", vec![(10.0, 106.0), (10.0, 106.01)]).unwrap());
        engine.set_moving("51H-11111", true, 0);
        for i in 1..=10 {
            engine.tick_all(i * 200);
        }
        assert!(engine.vehicle("51H-11111").unwrap().distance() > 0.0);

        engine.load_route(Route::new("51H-11111", vec![(10.0, 106.0), (10.0, 106.01)]).unwrap());
        let vehicle = engine.vehicle("51H-11111").unwrap();
        assert!(!vehicle.is_moving());
        assert_eq!(vehicle.distance(), 0.0);
    }

    #[test]
    fn toggle_takes_effect_between_ticks() {
        let mut engine = engine();
        engine.load_route(Route::new("51H-11111", vec![(10.0, 106.0), (10.0, 106.01)]).unwrap());

        assert!(engine.tick_all(200).is_empty());
        engine.set_moving("51H-11111", true, 300);
        engine.tick_all(400); // snap inicial
        assert_eq!(engine.tick_all(600).len(), 1);
        engine.set_moving("51H-11111", false, 700);
        assert!(engine.tick_all(800).is_empty());
    }
}
