//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del pipeline de tracking GPS.

pub mod position;

pub use position::{Behavior, CachedPosition, IngestFrame, MovementStatus, PositionEvent};
