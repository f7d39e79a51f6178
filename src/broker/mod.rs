//! Broker de eventos
//!
//! Desacopla el ingest del procesamiento: el endpoint de ingest publica en un
//! log append-only (stream de Redis) y uno o más consumidores se suscriben de
//! forma independiente y durable. Un consumidor lento o reiniciado no pierde
//! eventos ni bloquea la ingesta.

pub mod consumer;
pub mod producer;

pub use consumer::{apply_payload, StreamConsumer};
pub use producer::{EventPublisher, StreamProducer};
