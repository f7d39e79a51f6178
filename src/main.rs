use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use dotenvy::dotenv;
use tower_http::trace::TraceLayer;

use gps_tracking::broker::{StreamConsumer, StreamProducer};
use gps_tracking::cache::{CacheConfig, PositionCache, RedisClient};
use gps_tracking::config::EnvironmentConfig;
use gps_tracking::middleware::{cors_middleware, cors_middleware_with_origins};
use gps_tracking::{api, ingest, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🛰️ GPS Live Tracking - Car Rental Marketplace");
    info!("=============================================");

    let config = EnvironmentConfig::from_env();

    // Inicializar Redis (cache de posiciones + broker de eventos)
    let cache_config = CacheConfig {
        redis_url: config.redis_url.clone(),
        position_ttl: config.position_ttl(),
        max_connections: 10,
    };

    let redis_client = match RedisClient::new(cache_config).await {
        Ok(client) => client,
        Err(e) => {
            error!("❌ Error conectando a Redis: {}", e);
            return Err(anyhow::anyhow!("Error de Redis: {}", e));
        }
    };

    let cache = PositionCache::new(redis_client.clone());

    // Consumidor del broker: stream -> cache (proceso lógico independiente,
    // coordinado con los pollers solo a través del cache)
    let consumer = StreamConsumer::new(
        &redis_client,
        config.gps_stream_key.clone(),
        config.gps_consumer_group.clone(),
    );
    let consumer_store = Arc::new(cache.clone());
    tokio::spawn(async move {
        consumer.run(consumer_store).await;
    });

    // Endpoint de ingest: socket TCP persistente para dispositivos/simuladores
    let ingest_addr: SocketAddr = format!("{}:{}", config.host, config.ingest_port).parse()?;
    let ingest_listener = tokio::net::TcpListener::bind(ingest_addr).await?;
    let producer = Arc::new(StreamProducer::new(&redis_client, config.gps_stream_key.clone()));
    tokio::spawn(ingest::run(ingest_listener, producer));

    // Router de la API
    let cors = if config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(config.cors_origins.clone())
    };

    let state = AppState::new(config.clone(), cache);
    let app = Router::new()
        .merge(api::create_api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check del servicio");
    info!("   GET  /gps/sse?l=<matricula> - Broadcast de posiciones (SSE)");
    info!("📡 Ingest GPS:");
    info!("   TCP {} - Frames JSON por línea {{\"type\":\"update_position\",\"data\":{{...}}}}", ingest_addr);
    info!("🗄️ Broker: stream '{}' (grupo '{}')", config.gps_stream_key, config.gps_consumer_group);

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
