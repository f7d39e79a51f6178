//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El cache se construye una sola vez al
//! arrancar y se inyecta explícitamente: nada de singletons globales.

use crate::cache::PositionCache;
use crate::config::EnvironmentConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub cache: PositionCache,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, cache: PositionCache) -> Self {
        Self { config, cache }
    }
}
