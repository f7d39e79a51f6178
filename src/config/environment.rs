//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de
//! configuración del pipeline. Todos los valores tienen defaults de
//! desarrollo local; en producción se sobreescriben vía entorno.

use std::env;
use std::str::FromStr;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    /// Puerto HTTP (SSE + health)
    pub port: u16,
    /// Puerto del socket de ingest GPS
    pub ingest_port: u16,
    pub redis_url: String,
    /// Stream de Redis que hace de log de eventos
    pub gps_stream_key: String,
    /// Consumer group del escritor de cache
    pub gps_consumer_group: String,
    /// Cadencia de sondeo del broadcast SSE
    pub sse_poll_interval_ms: u64,
    /// Intervalo del tick del simulador
    pub sim_tick_interval_ms: u64,
    pub speeding_threshold_kmh: f64,
    /// Tolerancia de snap al waypoint, en grados por eje
    pub snap_tolerance_deg: f64,
    /// TTL de las posiciones cacheadas; 0 = sin expiración
    pub position_ttl_secs: u64,
    pub cors_origins: Vec<String>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Valor inválido para {}: '{}', usando default", name, value);
            default
        }),
        Err(_) => default,
    }
}

impl EnvironmentConfig {
    pub fn from_env() -> Self {
        Self {
            environment: env_or("ENVIRONMENT", "development"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000),
            ingest_port: env_parse("INGEST_PORT", 4001),
            redis_url: env_or("REDIS_URL", "redis://localhost:6379"),
            gps_stream_key: env_or("GPS_STREAM_KEY", "gps_tracking:events"),
            gps_consumer_group: env_or("GPS_CONSUMER_GROUP", "position-cache-writers"),
            sse_poll_interval_ms: env_parse("SSE_POLL_INTERVAL_MS", 2000),
            sim_tick_interval_ms: env_parse("SIM_TICK_INTERVAL_MS", 200),
            speeding_threshold_kmh: env_parse("SPEEDING_THRESHOLD_KMH", 80.0),
            snap_tolerance_deg: env_parse("SNAP_TOLERANCE_DEG", 0.001),
            position_ttl_secs: env_parse("POSITION_TTL_SECS", 0),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TTL efectivo de posiciones (`None` = persistir)
    pub fn position_ttl(&self) -> Option<u64> {
        if self.position_ttl_secs == 0 {
            None
        } else {
            Some(self.position_ttl_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_dev_values() {
        let config = EnvironmentConfig::from_env();
        assert_eq!(config.sim_tick_interval_ms, 200);
        assert_eq!(config.sse_poll_interval_ms, 2000);
        assert_eq!(config.speeding_threshold_kmh, 80.0);
        assert_eq!(config.snap_tolerance_deg, 0.001);
        assert!(config.position_ttl().is_none());
    }
}
