use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use latency_proxy::{LatencyMonitored, MonitorConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod catalog;
mod handlers;
mod load_generator;
mod server;

use catalog::InMemoryCatalog;

const DEFAULT_PORT: u16 = 3000;

/// The demo catalog with every call routed through a latency proxy.
pub type MonitoredCatalog = LatencyMonitored<InMemoryCatalog>;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Proxied catalog. Its registry backs the `/api/monitors` routes.
    pub catalog: Arc<MonitoredCatalog>,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,

    /// Handle to the spawned load-generator task so we can await clean shutdown.
    pub load_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[tokio::main]
async fn main() {
    let filter = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    if let Err(e) = run().await {
        error!("latency observatory exited: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // ── 1. Monitor configuration ─────────────────────────────────
    let mut config = MonitorConfig::from_env()?;
    if std::env::var("LATENCY_MONITOR_NAME").is_err() {
        config = config.with_name("catalog");
    }

    // ── 2. Seed the catalog and wrap it ──────────────────────────
    let catalog = LatencyMonitored::new(InMemoryCatalog::seeded(), &catalog::interfaces(), config)?;

    // ── 3. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        load_running: Arc::new(AtomicBool::new(false)),
        load_handle: tokio::sync::Mutex::new(None),
    });

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let port = match std::env::var("API_PORT") {
        Ok(raw) => raw.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "server listening");
    info!("monitors JSON → http://localhost:{port}/api/monitors");
    info!("monitors SSE  → http://localhost:{port}/api/monitors/stream");

    axum::serve(listener, app).await?;
    Ok(())
}
