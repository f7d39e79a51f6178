use colored::*;
use futures::StreamExt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use gps_tracking::models::CachedPosition;
use gps_tracking::simulation::{Route, SimulationConfig, SimulationEngine};

/// Reconexión del dashboard: espera fija entre reintentos
const RECONNECT_DELAY: Duration = Duration::from_secs(3);
/// Actualizaciones que muestra el dashboard antes de volver al menú
const DASHBOARD_UPDATES: usize = 20;

/// Ruta demo por el centro de Saigón
fn demo_route() -> Vec<(f64, f64)> {
    vec![
        (10.7769, 106.7009),
        (10.7769, 106.7059),
        (10.7809, 106.7059),
        (10.7809, 106.7109),
    ]
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "🛰️ Simulador GPS - Car Rental".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    let ingest_addr = env_or("INGEST_ADDR", "127.0.0.1:4001");
    let api_url = env_or("API_URL", "http://127.0.0.1:3000");
    let tick_ms: u64 = env_or("SIM_TICK_INTERVAL_MS", "200")
        .parse()
        .unwrap_or(200)
        .max(1);

    // Conexión persistente al ingest (una conexión, muchos vehículos)
    println!(
        "{}",
        format!("🔌 Conectando al ingest en {}...", ingest_addr).bright_yellow()
    );
    let socket = TcpStream::connect(&ingest_addr).await?;
    println!("{}", "✅ Conectado al ingest".bright_green());
    let (read_half, write_half) = socket.into_split();

    // Las respuestas del ingest son solo errores: mostrarlas en rojo
    tokio::spawn(async move {
        let mut replies = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = replies.next_line().await {
            eprintln!("{}", format!("🚫 Ingest rechazó un frame: {}", line).bright_red());
        }
    });

    let config = SimulationConfig {
        tick_interval: Duration::from_millis(tick_ms),
        ..SimulationConfig::default()
    };
    let engine = Arc::new(Mutex::new(SimulationEngine::new(config)));
    let writer = Arc::new(Mutex::new(write_half));

    // Un único timer global: cada tick avanza todos los vehículos en
    // movimiento y empuja los eventos por el socket. Los toggles del menú
    // toman el lock del motor, así que surten efecto en el tick siguiente.
    {
        let engine = Arc::clone(&engine);
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
            loop {
                interval.tick().await;
                let now_ms = chrono::Utc::now().timestamp_millis();
                let events = engine.lock().await.tick_all(now_ms);
                if events.is_empty() {
                    continue;
                }

                let mut writer = writer.lock().await;
                for event in events {
                    let frame = serde_json::json!({ "type": "update_position", "data": event });
                    let line = frame.to_string() + "\n";
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        eprintln!(
                            "{}",
                            format!("❌ Se perdió la conexión al ingest: {}", e).bright_red()
                        );
                        return;
                    }
                }
            }
        });
    }

    // Menú principal
    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🗺️ Cargar ruta para un vehículo");
        println!("2. 🚦 Arrancar / detener un vehículo");
        println!("3. 📊 Ver estado de la simulación");
        println!("4. 📺 Dashboard en vivo (SSE)");
        println!("5. 🚪 Salir");
        print!("{}", "Selecciona una opción (1-5): ".bright_yellow());
        io::stdout().flush()?;

        let mut choice = String::new();
        io::stdin().read_line(&mut choice)?;
        let choice = choice.trim();

        match choice {
            "1" => load_route(&engine).await?,
            "2" => toggle_movement(&engine).await?,
            "3" => show_status(&engine).await,
            "4" => {
                let plate = read_line("Matrícula a seguir: ")?;
                if plate.is_empty() {
                    println!("{}", "❌ Matrícula vacía".bright_red());
                } else {
                    watch_dashboard(&api_url, &plate).await;
                }
            }
            "5" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
            }
        }
    }

    Ok(())
}

fn read_line(prompt: &str) -> Result<String, Box<dyn std::error::Error>> {
    print!("{}", prompt.bright_yellow());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

async fn load_route(
    engine: &Arc<Mutex<SimulationEngine>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let plate = read_line("Matrícula (ej: 51H-12345): ")?;
    if plate.is_empty() {
        println!("{}", "❌ Matrícula vacía".bright_red());
        return Ok(());
    }

    let answer = read_line("¿Usar ruta demo por Saigón? (s/n): ")?;
    let points = if answer.eq_ignore_ascii_case("n") {
        let raw = read_line("Waypoints como lat,lng separados por espacio: ")?;
        match parse_waypoints(&raw) {
            Some(points) => points,
            None => {
                println!("{}", "❌ Waypoints inválidos".bright_red());
                return Ok(());
            }
        }
    } else {
        demo_route()
    };

    match Route::new(plate.clone(), points) {
        Some(route) => {
            engine.lock().await.load_route(route);
            println!(
                "{}",
                format!("✅ Ruta cargada para {} (vehículo detenido)", plate).bright_green()
            );
        }
        None => println!("{}", "❌ La ruta necesita al menos un waypoint".bright_red()),
    }
    Ok(())
}

fn parse_waypoints(raw: &str) -> Option<Vec<(f64, f64)>> {
    let mut points = Vec::new();
    for pair in raw.split_whitespace() {
        let (lat, lng) = pair.split_once(',')?;
        points.push((lat.trim().parse().ok()?, lng.trim().parse().ok()?));
    }
    if points.is_empty() {
        None
    } else {
        Some(points)
    }
}

async fn toggle_movement(
    engine: &Arc<Mutex<SimulationEngine>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let plate = read_line("Matrícula: ")?;
    if plate.is_empty() {
        println!("{}", "❌ Matrícula vacía".bright_red());
        return Ok(());
    }

    let mut engine = engine.lock().await;
    let moving = engine
        .vehicle(&plate)
        .map(|vehicle| vehicle.is_moving())
        .unwrap_or(false);

    let now_ms = chrono::Utc::now().timestamp_millis();
    if engine.set_moving(&plate, !moving, now_ms) {
        let state = if !moving { "en movimiento 🟢" } else { "detenido 🔴" };
        println!("{}", format!("🚦 {} ahora está {}", plate, state).bright_green());
    } else {
        println!(
            "{}",
            format!("❌ {} no tiene ruta cargada (opción 1 primero)", plate).bright_red()
        );
    }
    Ok(())
}

async fn show_status(engine: &Arc<Mutex<SimulationEngine>>) {
    let engine = engine.lock().await;
    let plates = engine.plates();
    if plates.is_empty() {
        println!("{}", "📭 Sin vehículos cargados".bright_yellow());
        return;
    }

    println!();
    println!("{}", "📊 ESTADO DE LA SIMULACIÓN".bright_cyan().bold());
    for plate in plates {
        if let Some(vehicle) = engine.vehicle(&plate) {
            let route = vehicle.route();
            let state = if vehicle.is_moving() {
                "🟢 en movimiento".to_string()
            } else if route.is_complete() {
                "🏁 ruta completa".to_string()
            } else {
                "🔴 detenido".to_string()
            };
            println!(
                "  {} | {} | pos ({:.5}, {:.5}) | waypoint {}/{} | {:.1} km/h | {:.3} km",
                plate.bright_white().bold(),
                state,
                route.cur_pos.0,
                route.cur_pos.1,
                route.next_target,
                route.points.len(),
                vehicle.speed(),
                vehicle.distance(),
            );
        }
    }
}

/// Consumidor de dashboard: se suscribe al broadcast SSE y muestra posición,
/// velocidad, distancia y alertas de exceso de velocidad. Si el stream se
/// cae, reintenta con una espera fija.
async fn watch_dashboard(api_url: &str, plate: &str) {
    let client = reqwest::Client::new();
    let url = format!("{}/gps/sse?l={}", api_url, urlencoding::encode(plate));

    let mut shown = 0usize;
    let mut attempts = 0usize;

    while shown < DASHBOARD_UPDATES && attempts < 5 {
        attempts += 1;
        println!(
            "{}",
            format!("📡 Conectando al broadcast de {}...", plate).bright_yellow()
        );

        let response = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                println!(
                    "{}",
                    format!("❌ El servidor respondió {}", response.status()).bright_red()
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
            Err(e) => {
                println!("{}", format!("❌ No se pudo conectar: {}", e).bright_red());
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(_) => break,
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // los eventos SSE terminan con línea en blanco
            while let Some(boundary) = buffer.find("\n\n") {
                let raw_event = buffer[..boundary].to_string();
                buffer.drain(..boundary + 2);

                if render_sse_event(&raw_event) {
                    shown += 1;
                }
            }

            if shown >= DASHBOARD_UPDATES {
                println!("{}", "📺 Fin de la vista en vivo".bright_cyan());
                return;
            }
        }

        println!(
            "{}",
            format!(
                "⚠️ Stream cortado, reintentando en {}s...",
                RECONNECT_DELAY.as_secs()
            )
            .bright_yellow()
        );
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Mostrar un evento SSE crudo. Devuelve true si era una actualización.
fn render_sse_event(raw_event: &str) -> bool {
    let mut event_name = "";
    let mut data = String::new();
    for line in raw_event.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event_name = value.trim();
        } else if let Some(value) = line.strip_prefix("data:") {
            data = value.trim().to_string();
        }
    }

    match event_name {
        "gps" => match serde_json::from_str::<CachedPosition>(&data) {
            Ok(position) => {
                let speed = position.speed.unwrap_or(0.0);
                let distance = position.total_distance.unwrap_or(0.0);
                let line = format!(
                    "📍 ({:.5}, {:.5}) | {:>6.1} km/h | {:.3} km",
                    position.lat, position.lng, speed, distance
                );
                if position.behavior.as_deref() == Some("SPEEDING") {
                    println!("{} {}", line, "🚨 EXCESO DE VELOCIDAD".bright_red().bold());
                } else {
                    println!("{}", line.bright_white());
                }
                true
            }
            Err(_) => false,
        },
        "gps_not_found" => {
            println!("{}", format!("🕳️ {}", data).bright_yellow());
            true
        }
        _ => {
            if data == "Connected" {
                println!("{}", "✅ Suscripto al broadcast".bright_green());
            }
            false
        }
    }
}
