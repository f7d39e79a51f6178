//! Máquina de estados de un vehículo simulado
//!
//! Dead reckoning sobre la ruta cargada: cada tick avanza la posición por
//! interpolación lineal sobre el tramo actual, deriva velocidad y distancia
//! de los desplazamientos sucesivos y clasifica el comportamiento contra el
//! umbral de velocidad.

use std::time::Duration;

use crate::models::{Behavior, MovementStatus, PositionEvent};
use crate::utils::geo::haversine_km;

use super::route::Route;

/// Cada tramo se recorre en una cantidad fija de pasos: la velocidad de
/// recorrido resulta proporcional al largo del tramo. Es una simplificación
/// deliberada del modelo, no un control de crucero físico.
pub const STEPS_PER_LEG: f64 = 100.0;

/// Estado de simulación de un vehículo: ruta + flag de movimiento + métricas
/// derivadas. Mutado únicamente por `tick`.
#[derive(Debug, Clone)]
pub struct VehicleSim {
    route: Route,
    moving: bool,
    speed: f64,
    distance: f64,
    behavior: Behavior,
    last_time_running: Option<i64>,
    last_time_stopped: Option<i64>,
}

impl VehicleSim {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            moving: false,
            speed: 0.0,
            distance: 0.0,
            behavior: Behavior::Normal,
            last_time_running: None,
            last_time_stopped: None,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Velocidad instantánea del último tick de avance (km/h)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Distancia acumulada (km); no decrece mientras se mueve
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Activar o detener el movimiento. Sobre una ruta completada el flag
    /// queda en false: la condición terminal no tiene wraparound.
    pub fn set_moving(&mut self, moving: bool, now_ms: i64) {
        if moving && self.route.is_complete() {
            return;
        }
        if moving {
            self.last_time_running = Some(now_ms);
        } else {
            self.last_time_stopped = Some(now_ms);
        }
        self.moving = moving;
    }

    /// Un tick de avance. Devuelve el evento a emitir hacia el ingest, o
    /// `None` si el vehículo está detenido, la ruta terminó, o el tick solo
    /// hizo snap sobre un waypoint (sin paso de movimiento).
    pub fn tick(
        &mut self,
        tick_interval: Duration,
        speeding_threshold_kmh: f64,
        snap_tolerance_deg: f64,
        now_ms: i64,
    ) -> Option<PositionEvent> {
        if !self.moving {
            return None;
        }

        // Condición terminal: sin más waypoints se limpia el flag y no se
        // vuelve a avanzar (ticks posteriores son no-ops)
        if self.route.is_complete() {
            self.moving = false;
            self.speed = 0.0;
            self.last_time_stopped = Some(now_ms);
            return None;
        }

        let old_pos = self.route.cur_pos;
        let target = self.route.points[self.route.next_target];
        let prev = if self.route.next_target == 0 {
            old_pos
        } else {
            self.route.points[self.route.next_target - 1]
        };

        let within_tolerance = (old_pos.0 - target.0).abs() <= snap_tolerance_deg
            && (old_pos.1 - target.1).abs() <= snap_tolerance_deg;

        if within_tolerance {
            // Snap al waypoint: evita oscilar alrededor del objetivo por el
            // redondeo de los pasos en coma flotante. En este tick no se
            // computa paso de movimiento (el resto sub-tolerancia no cuenta
            // como desplazamiento, que dispararía velocidades espurias).
            self.route.cur_pos = target;
            self.route.next_target += 1;
            return None;
        }

        self.route.cur_pos = interpolation_step(prev, target, old_pos);

        let moved_km = haversine_km(old_pos, self.route.cur_pos);
        self.distance += moved_km;
        // Velocidad instantánea extrapolada del desplazamiento de un tick
        self.speed = moved_km / tick_interval.as_secs_f64() * 3600.0;
        self.behavior = Behavior::classify(self.speed, speeding_threshold_kmh);

        Some(PositionEvent {
            license_number: self.route.license_number.clone(),
            lat: Some(self.route.cur_pos.0),
            lng: Some(self.route.cur_pos.1),
            last_position: None,
            speed: Some(self.speed),
            total_distance: Some(self.distance),
            state: Some(MovementStatus::Running),
            behavior: Some(self.behavior.as_str().to_string()),
            timestamp: Some(now_ms),
            last_time_running: self.last_time_running,
            last_time_stopped: self.last_time_stopped,
        })
    }
}

/// Paso de interpolación sobre la recta `prev -> target`: se avanza 1/100 del
/// delta de longitud y se proyecta la latitud con `y = a*x + b`.
///
/// Caso degenerado: en un tramo norte-sur puro (`prev.lng == target.lng`) la
/// pendiente es infinita, así que se avanza directo por latitud en vez de
/// dividir por cero.
fn interpolation_step(prev: (f64, f64), target: (f64, f64), cur: (f64, f64)) -> (f64, f64) {
    let (prev_lat, prev_lng) = prev;
    let (target_lat, target_lng) = target;
    let (cur_lat, cur_lng) = cur;

    let lng_delta = target_lng - prev_lng;
    if lng_delta == 0.0 {
        let step = (target_lat - prev_lat) / STEPS_PER_LEG;
        return (cur_lat + step, cur_lng);
    }

    let slope = (target_lat - prev_lat) / lng_delta;
    let intercept = prev_lat - slope * prev_lng;

    let next_lng = cur_lng + lng_delta / STEPS_PER_LEG;
    let next_lat = slope * next_lng + intercept;
    (next_lat, next_lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(200);
    const THRESHOLD: f64 = 80.0;
    const TOLERANCE: f64 = 0.001;

    fn sim(points: Vec<(f64, f64)>) -> VehicleSim {
        VehicleSim::new(Route::new("51H-12345", points).unwrap())
    }

    fn tick(sim: &mut VehicleSim, now_ms: i64) -> Option<PositionEvent> {
        sim.tick(TICK, THRESHOLD, TOLERANCE, now_ms)
    }

    #[test]
    fn no_events_while_stopped() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        assert!(tick(&mut vehicle, 0).is_none());
        assert_eq!(vehicle.distance(), 0.0);
    }

    #[test]
    fn first_tick_snaps_onto_starting_waypoint_without_event() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        vehicle.set_moving(true, 0);
        assert!(tick(&mut vehicle, 200).is_none());
        assert_eq!(vehicle.route().next_target, 1);
        assert_eq!(vehicle.distance(), 0.0);
    }

    #[test]
    fn completes_two_point_route_and_stays_stopped() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        vehicle.set_moving(true, 0);

        let mut now = 0i64;
        for _ in 0..500 {
            now += 200;
            tick(&mut vehicle, now);
            if !vehicle.is_moving() {
                break;
            }
        }

        assert!(!vehicle.is_moving(), "la ruta debería haber terminado");
        assert_eq!(vehicle.route().next_target, 2);
        assert_eq!(vehicle.route().cur_pos, (10.0, 106.01));

        // Idempotente en la terminación: más ticks no cambian nada
        let distance = vehicle.distance();
        assert!(tick(&mut vehicle, now + 200).is_none());
        assert_eq!(vehicle.distance(), distance);
        assert_eq!(vehicle.route().next_target, 2);
    }

    #[test]
    fn distance_is_monotonic_while_moving() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01), (10.01, 106.01)]);
        vehicle.set_moving(true, 0);

        let mut last = 0.0;
        let mut now = 0i64;
        for _ in 0..300 {
            now += 200;
            tick(&mut vehicle, now);
            assert!(
                vehicle.distance() >= last,
                "la distancia acumulada retrocedió: {} < {}",
                vehicle.distance(),
                last
            );
            last = vehicle.distance();
        }
        assert!(last > 0.0);
    }

    #[test]
    fn distance_frozen_while_stopped() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        vehicle.set_moving(true, 0);
        for i in 0..10 {
            tick(&mut vehicle, i * 200);
        }
        let travelled = vehicle.distance();
        assert!(travelled > 0.0);

        vehicle.set_moving(false, 2_000);
        for i in 10..20 {
            assert!(tick(&mut vehicle, i * 200).is_none());
        }
        assert_eq!(vehicle.distance(), travelled);
    }

    #[test]
    fn fast_leg_classifies_as_speeding() {
        // Tramo de 0.01° de longitud: ~11 m por tick de 200 ms -> ~200 km/h
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        vehicle.set_moving(true, 0);

        tick(&mut vehicle, 200); // snap sobre el waypoint inicial
        let event = tick(&mut vehicle, 400).expect("evento de avance");
        assert!(event.speed.unwrap() > THRESHOLD);
        assert_eq!(event.behavior.as_deref(), Some("SPEEDING"));
    }

    #[test]
    fn slow_leg_classifies_as_normal() {
        // Tramo de 0.002°: ~2.2 m por tick -> ~40 km/h
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.002)]);
        vehicle.set_moving(true, 0);

        tick(&mut vehicle, 200); // snap inicial
        let event = tick(&mut vehicle, 400).expect("evento de avance");
        let speed = event.speed.unwrap();
        assert!(speed > 0.0 && speed <= THRESHOLD, "velocidad: {}", speed);
        assert_eq!(event.behavior.as_deref(), Some("NORMAL"));
    }

    #[test]
    fn vertical_leg_does_not_divide_by_zero() {
        // Tramo norte-sur puro: misma longitud en ambos waypoints
        let mut vehicle = sim(vec![(10.0, 106.0), (10.01, 106.0)]);
        vehicle.set_moving(true, 0);

        let mut saw_movement = false;
        let mut now = 0i64;
        for _ in 0..300 {
            now += 200;
            if let Some(event) = tick(&mut vehicle, now) {
                saw_movement = true;
                assert!(event.lat.unwrap().is_finite());
                assert!(event.lng.unwrap().is_finite());
                assert!(event.speed.unwrap().is_finite());
                assert_eq!(event.lng.unwrap(), 106.0);
            }
            if !vehicle.is_moving() {
                break;
            }
        }
        assert!(saw_movement);
        assert!(!vehicle.is_moving());
        assert_eq!(vehicle.route().cur_pos, (10.01, 106.0));
    }

    #[test]
    fn zero_length_leg_snaps_through() {
        // Waypoint duplicado: el tramo de largo cero se atraviesa por snap
        // sin producir NaN ni quedarse clavado
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.0), (10.0, 106.002)]);
        vehicle.set_moving(true, 0);

        let mut now = 0i64;
        for _ in 0..300 {
            now += 200;
            if let Some(event) = tick(&mut vehicle, now) {
                assert!(event.lat.unwrap().is_finite());
                assert!(event.lng.unwrap().is_finite());
            }
            if !vehicle.is_moving() {
                break;
            }
        }
        assert!(!vehicle.is_moving());
        assert_eq!(vehicle.route().next_target, 3);
        assert!(vehicle.distance() > 0.0);
    }

    #[test]
    fn events_carry_running_state_and_timestamps() {
        let mut vehicle = sim(vec![(10.0, 106.0), (10.0, 106.01)]);
        vehicle.set_moving(true, 1_000);

        assert!(tick(&mut vehicle, 1_200).is_none()); // snap inicial
        let event = tick(&mut vehicle, 1_400).expect("evento");
        assert_eq!(event.license_number, "51H-12345");
        assert_eq!(event.state, Some(MovementStatus::Running));
        assert_eq!(event.timestamp, Some(1_400));
        assert_eq!(event.last_time_running, Some(1_000));
    }

    #[test]
    fn toggle_on_completed_route_stays_stopped() {
        let mut vehicle = sim(vec![(10.0, 106.0)]);
        vehicle.set_moving(true, 0);
        tick(&mut vehicle, 200); // snap al único waypoint -> completa
        tick(&mut vehicle, 400); // condición terminal limpia el flag
        assert!(!vehicle.is_moving());

        vehicle.set_moving(true, 600);
        assert!(!vehicle.is_moving());
    }
}
