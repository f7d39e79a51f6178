//! Ingest
//!
//! Este módulo contiene el endpoint de ingest: el socket persistente por el
//! que dispositivos y simuladores reportan posiciones.

pub mod server;

pub use server::{process_frame, run};
