/**
 * DEVWATCH KERNEL - Point d'entrée du serveur de métriques
 *
 * RÔLE : Charge la config, ouvre le pool SQLite, monte les routes et sert en HTTPS.
 *
 * ARCHITECTURE : une partition (table) par identité, upsert d'un seul snapshot
 * courant par identité, lecture brute des partitions pour le dashboard.
 */

mod config;
mod health;
mod http;
mod models;
mod server;
mod store;
mod validator;

use crate::config::load_config;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::store::Storage;

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;

    let pool = store::initialize_pool(&cfg.storage.path, cfg.storage.pool_size)
        .with_context(|| format!("Failed to open storage at {}", cfg.storage.path.display()))?;
    info!("storage ready at {} (pool size {})", cfg.storage.path.display(), cfg.storage.pool_size);

    let storage = Storage::new(pool, cfg.storage.partition_suffix.clone());

    let ip: IpAddr = cfg
        .server
        .ip
        .parse()
        .with_context(|| format!("Invalid server ip '{}'", cfg.server.ip))?;
    let addr = SocketAddr::new(ip, cfg.server.port);
    let tls = cfg.tls.clone();

    let app_state = AppState {
        cfg: Arc::new(cfg),
        storage,
        health: HealthTracker::new(),
    };
    let app = http::build_router(app_state);

    server::serve(app, addr, tls.as_ref()).await
}
