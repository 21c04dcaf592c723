//! fbk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config,
//! attempts the database connection, builds the shared state, wires
//! middleware, and starts the HTTP server. All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use axum::http::{HeaderValue, Method};
use fbk_config::DaemonConfig;
use fbk_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_config()?;

    // The storefront fails open for reads: an unreachable database logs a
    // warning and the daemon serves the static demo catalog instead of
    // refusing to boot. `demo.fallback_enabled: false` opts out.
    let db = match connect_db(&cfg).await {
        Ok(pool) => {
            info!("database connected");
            Some(pool)
        }
        Err(e) if cfg.demo_fallback_enabled => {
            warn!(error = ?e, "database unreachable; starting in demo mode");
            None
        }
        Err(e) => return Err(e.context("database unreachable and demo fallback disabled")),
    };

    let shared = Arc::new(state::AppState::new(db));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&cfg)?;
    info!("fbk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("fbk-daemon shut down");
    Ok(())
}

async fn shutdown_signal() {
    // Finish in-flight requests on Ctrl-C instead of dropping them.
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = ?e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layered YAML config via FRESHBULK_CONFIG (colon-separated paths, base
/// first). Unset means all defaults.
fn load_config() -> anyhow::Result<DaemonConfig> {
    let Ok(paths_raw) = std::env::var("FRESHBULK_CONFIG") else {
        return Ok(DaemonConfig::default());
    };

    let paths: Vec<&str> = paths_raw.split(':').filter(|p| !p.is_empty()).collect();
    let loaded = fbk_config::load_layered_yaml(&paths).context("config load failed")?;
    info!(config_hash = %loaded.config_hash, "config loaded");
    Ok(DaemonConfig::from_value(&loaded.config_json))
}

async fn connect_db(cfg: &DaemonConfig) -> anyhow::Result<sqlx::PgPool> {
    let url = std::env::var(&cfg.database_url_env)
        .with_context(|| format!("missing env var {}", cfg.database_url_env))?;
    fbk_db::connect(&url, cfg.db_max_connections).await
}

fn bind_addr(cfg: &DaemonConfig) -> anyhow::Result<SocketAddr> {
    // Env override wins over config, for container deployments.
    let raw = std::env::var("FRESHBULK_DAEMON_ADDR").unwrap_or_else(|_| cfg.bind_addr.clone());
    match raw.parse() {
        Ok(addr) => Ok(addr),
        Err(_) => bail!("invalid bind address: {raw}"),
    }
}

/// CORS: allow only localhost origins (the storefront frontend dev servers).
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
