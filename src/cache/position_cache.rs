//! Cache de posiciones
//!
//! Una entrada por vehículo, clave = matrícula, valor = última posición
//! conocida. La escritura sobreescribe incondicionalmente (last-write-wins):
//! con entrega at-least-once del broker, reescribir el mismo valor es
//! naturalmente idempotente y no hace falta ningún lock distribuido.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CachedPosition;

use super::redis_client::{CacheOperations, RedisClient};

/// Costura inyectable sobre el almacén de posiciones.
///
/// El consumidor del broker escribe a través de este trait y el endpoint de
/// broadcast lee a través de él; los tests lo implementan en memoria.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Sobreescribir la última posición del vehículo (nunca merge)
    async fn store_position(&self, position: &CachedPosition) -> Result<()>;

    /// Leer la última posición; `Ok(None)` es el estado normal de un
    /// vehículo que todavía no reportó, no un error.
    async fn latest_position(&self, license_number: &str) -> Result<Option<CachedPosition>>;
}

/// Cache de posiciones respaldado por Redis
#[derive(Clone)]
pub struct PositionCache {
    client: RedisClient,
    ttl: Option<u64>,
}

impl PositionCache {
    pub fn new(client: RedisClient) -> Self {
        let ttl = client.config().position_ttl;
        Self { client, ttl }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

#[async_trait]
impl PositionStore for PositionCache {
    async fn store_position(&self, position: &CachedPosition) -> Result<()> {
        let key = self.client.position_key(&position.license_number);
        self.client.set(&key, position, self.ttl).await
    }

    async fn latest_position(&self, license_number: &str) -> Result<Option<CachedPosition>> {
        let key = self.client.position_key(license_number);
        self.client.get(&key).await
    }
}
