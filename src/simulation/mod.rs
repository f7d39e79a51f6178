//! Simulación de posiciones
//!
//! El motor de dead reckoning que usa la herramienta de simulación GPS:
//! rutas por vehículo, máquina de estados de movimiento y el coordinador que
//! avanza todo en cada tick. El estado vive enteramente del lado del cliente;
//! el servidor solo ve los eventos de posición que el motor emite.

pub mod engine;
pub mod route;
pub mod vehicle;

pub use engine::{SimulationConfig, SimulationEngine};
pub use route::Route;
pub use vehicle::{VehicleSim, STEPS_PER_LEG};
