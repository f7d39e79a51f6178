//! Configuración de cache
//!
//! Este módulo contiene la configuración para el sistema de cache.

use serde::{Deserialize, Serialize};

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    /// TTL en segundos para las posiciones; `None` = sin expiración.
    /// La última posición conocida es válida hasta que llegue la siguiente.
    pub position_ttl: Option<u64>,
    pub max_connections: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            position_ttl: None,
            max_connections: 10,
        }
    }
}
