//! Cache
//!
//! Este módulo contiene el cliente Redis compartido y el cache de la última
//! posición conocida por vehículo.

pub mod cache_config;
pub mod position_cache;
pub mod redis_client;

pub use cache_config::CacheConfig;
pub use position_cache::{PositionCache, PositionStore};
pub use redis_client::{CacheOperations, RedisClient};
